use chrono::{DateTime, Utc};
use dino_shared::daily_tasks::task_day;
use dino_shared::reward::RewardCatalog;
use dino_shared::spin_api::{SpinResponse, SpinStatusResponse};
use dino_shared::wheel::WheelSpin;
use rand::Rng;
use uuid::Uuid;

use crate::error::AppError;
use crate::store::SpinStore;

/// Loads the active rewards and validates them into a catalog.
pub async fn load_catalog(store: &dyn SpinStore) -> Result<RewardCatalog, AppError> {
    let rows = store.active_rewards().await?;
    Ok(RewardCatalog::from_rows(rows)?)
}

/// Runs one spin for `user_id`.
///
/// The reward is drawn once and the wheel is aimed at that same segment. The
/// store then spends the key and pays out in a single transaction; a spin that
/// loses a race for the last key fails there with `InsufficientKeys`.
pub async fn spin<R>(
    store: &dyn SpinStore,
    user_id: Uuid,
    current_rotation: f64,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<SpinResponse, AppError>
where
    R: Rng + Send + ?Sized,
{
    let catalog = load_catalog(store).await?;

    if !store.kitty_keys(user_id).await?.can_spin() {
        return Err(AppError::InsufficientKeys);
    }

    let (reward, wheel) = {
        let drawn = catalog.draw(rng)?;
        let wheel = WheelSpin::plan(catalog.segments(), drawn.index, current_rotation, rng)?;
        (drawn.reward.clone(), wheel)
    };

    let receipt = store.commit_spin(user_id, &reward, now).await?;

    tracing::info!(
        "🎡 SPIN: user {} won {} ({} coins, {}) at segment {}",
        user_id,
        reward.name,
        reward.coin_amount,
        reward.rarity,
        wheel.index
    );

    Ok(SpinResponse {
        message: format!("{}! +{} coins!", reward.name, reward.coin_amount),
        index: wheel.index,
        reward,
        wheel,
        attempt: receipt.attempt,
        kitty_keys: receipt.kitty_keys,
        coins: receipt.coins,
    })
}

pub async fn status(store: &dyn SpinStore, user_id: Uuid, now: DateTime<Utc>) -> Result<SpinStatusResponse, AppError> {
    let catalog = load_catalog(store).await?;
    let kitty_keys = store.kitty_keys(user_id).await?;
    let today_attempts = store.spin_attempts_on(user_id, task_day(now)).await?;

    Ok(SpinStatusResponse {
        rewards: catalog.rewards().to_vec(),
        can_spin: kitty_keys.can_spin(),
        kitty_keys,
        today_attempts,
    })
}
