//! The authoritative record of keys, coins, spins, task progress and badges.
//!
//! Every mutating call is atomic: it either applies completely or leaves the
//! store untouched. Callers may pre-check balances for a friendlier error, but
//! only the store decides.

use axum::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dino_shared::badges::{Badge, BadgeError, OwnedBadge};
use dino_shared::daily_tasks::{ClaimEligibility, DailyTask, ProgressUpdate, TaskError, TaskProgress};
use dino_shared::reward::{Reward, RewardRow};
use dino_shared::spin_api::SpinAttempt;
use dino_shared::wallet::{CoinWallet, KittyKeyWallet, WalletError};
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemorySpinStore;
pub use postgres::PgSpinStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Badge(#[from] BadgeError),
    #[error("kitty key cannot be claimed: {0:?}")]
    NotEligible(ClaimEligibility),
    #[error("stored row is corrupt: {0}")]
    Corrupt(String),
}

/// Result of a committed spin.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinReceipt {
    pub attempt: SpinAttempt,
    pub kitty_keys: KittyKeyWallet,
    pub coins: CoinWallet,
}

/// Result of a committed badge purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct BadgePurchase {
    pub badge: OwnedBadge,
    pub coins: CoinWallet,
}

#[async_trait]
pub trait SpinStore: Send + Sync {
    /// Active catalog rows ordered by `sort_order`.
    async fn active_rewards(&self) -> Result<Vec<RewardRow>, StoreError>;

    async fn kitty_keys(&self, user_id: Uuid) -> Result<KittyKeyWallet, StoreError>;

    async fn coins(&self, user_id: Uuid) -> Result<CoinWallet, StoreError>;

    /// Spins made on `day`, newest first.
    async fn spin_attempts_on(&self, user_id: Uuid, day: NaiveDate) -> Result<Vec<SpinAttempt>, StoreError>;

    /// Spends one kitty key, records the attempt and credits the reward's coins.
    async fn commit_spin(
        &self,
        user_id: Uuid,
        reward: &Reward,
        now: DateTime<Utc>,
    ) -> Result<SpinReceipt, StoreError>;

    /// Active daily tasks.
    async fn daily_tasks(&self) -> Result<Vec<DailyTask>, StoreError>;

    async fn task_progress(&self, user_id: Uuid, day: NaiveDate) -> Result<Vec<TaskProgress>, StoreError>;

    async fn has_claimed_key(&self, user_id: Uuid, day: NaiveDate) -> Result<bool, StoreError>;

    /// Adds progress to a task for the day of `now`; a task that becomes complete
    /// credits its coin reward in the same transaction.
    async fn record_task_progress(
        &self,
        user_id: Uuid,
        task_key: &str,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<ProgressUpdate, StoreError>;

    /// Grants the daily kitty key if every task for the day of `now` is complete
    /// and no key was claimed yet that day.
    async fn claim_kitty_key(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<KittyKeyWallet, StoreError>;

    /// Active store badges ordered by `sort_order`.
    async fn badges(&self) -> Result<Vec<Badge>, StoreError>;

    async fn owned_badges(&self, user_id: Uuid) -> Result<Vec<OwnedBadge>, StoreError>;

    /// Debits the badge price from the user's coins and records ownership, or does
    /// neither.
    async fn purchase_badge(
        &self,
        user_id: Uuid,
        badge_key: &str,
        now: DateTime<Utc>,
    ) -> Result<BadgePurchase, StoreError>;
}
