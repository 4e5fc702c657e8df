use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::badges::BadgeWithOwnership;
use crate::daily_tasks::{ClaimEligibility, TaskWithProgress};
use crate::reward::Reward;
use crate::wallet::{CoinWallet, KittyKeyWallet};
use crate::wheel::WheelSpin;

/// One recorded spin, as kept by the store.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpinAttempt {
    pub id: String,
    pub reward_id: String,
    pub coins_won: i64,
    pub spin_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

// === API Types ===

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct SpinRequest {
    #[serde(default)]
    pub current_rotation: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SpinResponse {
    pub reward: Reward,
    pub index: usize,
    pub wheel: WheelSpin,
    pub attempt: SpinAttempt,
    pub kitty_keys: KittyKeyWallet,
    pub coins: CoinWallet,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SpinStatusResponse {
    pub rewards: Vec<Reward>,
    pub kitty_keys: KittyKeyWallet,
    pub can_spin: bool,
    pub today_attempts: Vec<SpinAttempt>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskProgressRequest {
    pub task_key: String,
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DailyTasksResponse {
    pub tasks: Vec<TaskWithProgress>,
    pub completed: usize,
    pub total: usize,
    pub eligibility: ClaimEligibility,
    pub can_claim_kitty_key: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimResponse {
    pub claimed: bool,
    pub kitty_keys: KittyKeyWallet,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BadgeStoreResponse {
    pub badges: Vec<BadgeWithOwnership>,
    pub coins: CoinWallet,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PurchaseBadgeRequest {
    pub badge_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BadgePurchaseResponse {
    pub badge: BadgeWithOwnership,
    pub coins: CoinWallet,
    pub message: String,
}
