use chrono::{DateTime, Utc};
use dino_shared::constants::CLAIM_SUCCESS_MESSAGE;
use dino_shared::daily_tasks::{completed_count, task_day, with_progress, ClaimEligibility, ProgressUpdate};
use dino_shared::spin_api::{ClaimResponse, DailyTasksResponse, TaskProgressRequest};
use uuid::Uuid;

use crate::error::AppError;
use crate::store::SpinStore;

pub async fn overview(store: &dyn SpinStore, user_id: Uuid, now: DateTime<Utc>) -> Result<DailyTasksResponse, AppError> {
    let day = task_day(now);
    let tasks = store.daily_tasks().await?;
    let progress = store.task_progress(user_id, day).await?;
    let claimed = store.has_claimed_key(user_id, day).await?;

    let eligibility = ClaimEligibility::evaluate(&tasks, &progress, claimed);

    Ok(DailyTasksResponse {
        completed: completed_count(&tasks, &progress),
        total: tasks.len(),
        tasks: with_progress(&tasks, &progress),
        can_claim_kitty_key: eligibility.is_eligible(),
        eligibility,
    })
}

pub async fn progress(
    store: &dyn SpinStore,
    user_id: Uuid,
    request: &TaskProgressRequest,
    now: DateTime<Utc>,
) -> Result<ProgressUpdate, AppError> {
    let update = store
        .record_task_progress(user_id, &request.task_key, request.amount, now)
        .await?;

    if update.newly_completed {
        tracing::info!(
            "✅ TASK: user {} completed {} (+{} coins)",
            user_id,
            request.task_key,
            update.reward_coins
        );
    }
    Ok(update)
}

pub async fn claim_key(store: &dyn SpinStore, user_id: Uuid, now: DateTime<Utc>) -> Result<ClaimResponse, AppError> {
    let kitty_keys = store.claim_kitty_key(user_id, now).await?;
    tracing::info!("🗝️ CLAIM: user {} claimed a kitty key (balance {})", user_id, kitty_keys.balance);

    Ok(ClaimResponse {
        claimed: true,
        kitty_keys,
        message: CLAIM_SUCCESS_MESSAGE.to_string(),
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

    fn request(task_key: &str, amount: i64) -> TaskProgressRequest {
        TaskProgressRequest {
            task_key: task_key.to_string(),
            amount,
        }
    }

    #[tokio::test]
    async fn test_overview_tracks_completion() {
        let store = MemorySpinStore::with_catalog(&RewardCatalog::default_wheel(), starter_tasks());
        let user = Uuid::new_v4();

        let before = overview(&store, user, now()).await.unwrap();
        assert_eq!((before.completed, before.total), (0, 3));
        assert_eq!(before.eligibility, ClaimEligibility::TasksRemaining(3));

        progress(&store, user, &request("watch_30_minutes", 900), now()).await.unwrap();
        let halfway = overview(&store, user, now()).await.unwrap();
        let watch = halfway
            .tasks
            .iter()
            .find(|t| t.task.task_key == "watch_30_minutes")
            .unwrap();
        assert_eq!(watch.progress_percentage, 50.0);

        for (key, amount) in [("watch_30_minutes", 900), ("daily_login", 1), ("share_video", 1)] {
            progress(&store, user, &request(key, amount), now()).await.unwrap();
        }
        let done = overview(&store, user, now()).await.unwrap();
        assert!(done.can_claim_kitty_key);

        let claim = claim_key(&store, user, now()).await.unwrap();
        assert!(claim.claimed);
        assert_eq!(claim.kitty_keys.balance, 1);

        let after = overview(&store, user, now()).await.unwrap();
        assert_eq!(after.eligibility, ClaimEligibility::AlreadyClaimed);
        assert!(!after.can_claim_kitty_key);
    }

    #[tokio::test]
    async fn test_claim_too_early() {
        let store = MemorySpinStore::with_catalog(&RewardCatalog::default_wheel(), starter_tasks());
        let err = claim_key(&store, Uuid::new_v4(), now()).await.unwrap_err();
        assert!(matches!(err, AppError::NotEligible(ClaimEligibility::TasksRemaining(3))));
    }

    #[tokio::test]
    async fn test_invalid_progress() {
        let store = MemorySpinStore::with_catalog(&RewardCatalog::default_wheel(), starter_tasks());
        let err = progress(&store, Uuid::new_v4(), &request("daily_login", 0), now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Task(_)));
    }
}
