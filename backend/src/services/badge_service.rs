use chrono::{DateTime, Utc};
use dino_shared::badges::{with_ownership, BadgeError};
use dino_shared::spin_api::{BadgePurchaseResponse, BadgeStoreResponse, PurchaseBadgeRequest};
use uuid::Uuid;

use crate::error::AppError;
use crate::store::SpinStore;

pub async fn store_front(store: &dyn SpinStore, user_id: Uuid) -> Result<BadgeStoreResponse, AppError> {
    let badges = store.badges().await?;
    let owned = store.owned_badges(user_id).await?;
    let coins = store.coins(user_id).await?;

    Ok(BadgeStoreResponse {
        badges: with_ownership(&badges, &owned),
        coins,
    })
}

pub async fn purchase(
    store: &dyn SpinStore,
    user_id: Uuid,
    request: &PurchaseBadgeRequest,
    now: DateTime<Utc>,
) -> Result<BadgePurchaseResponse, AppError> {
    let purchase = store.purchase_badge(user_id, &request.badge_key, now).await?;

    let badges = store.badges().await?;
    let badge = with_ownership(&badges, std::slice::from_ref(&purchase.badge))
        .into_iter()
        .find(|b| b.owned)
        .ok_or_else(|| BadgeError::UnknownBadge(request.badge_key.clone()))?;

    tracing::info!(
        "🏅 BADGE: user {} bought {} for {} coins (balance {})",
        user_id,
        badge.badge.badge_key,
        badge.badge.price_coins,
        purchase.coins.balance
    );

    Ok(BadgePurchaseResponse {
        message: format!("Badge \"{}\" berhasil dibeli!", badge.badge.name),
        badge,
        coins: purchase.coins,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::starter_tasks;
    use crate::store::MemorySpinStore;
    use chrono::TimeZone;
    use dino_shared::reward::RewardCatalog;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 8, 30, 0).unwrap()
    }

    fn request(key: &str) -> PurchaseBadgeRequest {
        PurchaseBadgeRequest {
            badge_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn test_task_coins_buy_a_badge() {
        let store = MemorySpinStore::with_catalog(&RewardCatalog::default_wheel(), starter_tasks());
        let user = Uuid::new_v4();

        let err = purchase(&store, user, &request("kitty_fan"), now()).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientCoins));

        for day in 0..2 {
            let when = now() + chrono::Duration::days(day);
            store.record_task_progress(user, "daily_login", 1, when).await.unwrap();
            store.record_task_progress(user, "watch_30_minutes", 1800, when).await.unwrap();
            store.record_task_progress(user, "share_video", 1, when).await.unwrap();
        }
        assert_eq!(store.coins(user).await.unwrap().balance, 100);

        let bought = purchase(&store, user, &request("kitty_fan"), now()).await.unwrap();
        assert!(bought.badge.owned);
        assert_eq!(bought.badge.purchased_at, Some(now()));
        assert_eq!(bought.coins.balance, 0);

        let front = store_front(&store, user).await.unwrap();
        let owned: Vec<_> = front.badges.iter().filter(|b| b.owned).map(|b| b.badge.badge_key.as_str()).collect();
        assert_eq!(owned, vec!["kitty_fan"]);
        assert_eq!(front.coins.total_spent, 100);

        let err = purchase(&store, user, &request("kitty_fan"), now()).await.unwrap_err();
        assert!(matches!(err, AppError::Badge(BadgeError::AlreadyOwned(_))));
    }
}
