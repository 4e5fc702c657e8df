use std::collections::{HashMap, HashSet};

use axum::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dino_shared::badges::{Badge, BadgeError, OwnedBadge};
use dino_shared::constants::{KITTY_KEYS_PER_CLAIM, SPIN_COST_KEYS};
use dino_shared::daily_tasks::{
    task_day, ClaimEligibility, DailyTask, ProgressUpdate, TaskError, TaskProgress, TaskType,
};
use dino_shared::reward::{Rarity, Reward, RewardCatalog, RewardRow};
use dino_shared::spin_api::SpinAttempt;
use dino_shared::wallet::{CoinWallet, KittyKeyWallet};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{BadgePurchase, SpinReceipt, SpinStore, StoreError};

#[derive(Default)]
struct Ledger {
    keys: HashMap<Uuid, KittyKeyWallet>,
    coins: HashMap<Uuid, CoinWallet>,
    attempts: HashMap<Uuid, Vec<SpinAttempt>>,
    progress: HashMap<(Uuid, NaiveDate, String), TaskProgress>,
    claims: HashSet<(Uuid, NaiveDate)>,
    badges: HashMap<Uuid, Vec<OwnedBadge>>,
}

/// In-process store for local development and tests. One lock guards the whole
/// ledger, which makes every operation trivially atomic.
pub struct MemorySpinStore {
    rewards: Vec<RewardRow>,
    tasks: Vec<DailyTask>,
    badges: Vec<Badge>,
    ledger: Mutex<Ledger>,
}

/// Tasks offered when no task table is available.
pub fn starter_tasks() -> Vec<DailyTask> {
    vec![
        DailyTask {
            task_key: "daily_login".to_string(),
            title: "Login Harian".to_string(),
            description: Some("Masuk ke akunmu hari ini".to_string()),
            task_type: TaskType::Login,
            target_value: 1,
            reward_coins: 10,
        },
        DailyTask {
            task_key: "watch_30_minutes".to_string(),
            title: "Tonton 30 Menit".to_string(),
            description: Some("Tonton video selama 30 menit".to_string()),
            task_type: TaskType::WatchTime,
            target_value: 1800,
            reward_coins: 25,
        },
        DailyTask {
            task_key: "share_video".to_string(),
            title: "Bagikan Video".to_string(),
            description: None,
            task_type: TaskType::Share,
            target_value: 1,
            reward_coins: 15,
        },
    ]
}

/// Badges sold when no badge table is available.
pub fn starter_badges() -> Vec<Badge> {
    let entries: [(&str, &str, i64, &str, Rarity, &str); 4] = [
        ("kitty_fan", "Kitty Fan", 100, "🐱", Rarity::Common, "#FFB6C1"),
        ("binge_watcher", "Binge Watcher", 250, "🍿", Rarity::Rare, "#48CAE4"),
        ("lucky_spinner", "Lucky Spinner", 500, "🎡", Rarity::Epic, "#C77DFF"),
        ("dino_legend", "Dino Legend", 1500, "🦖", Rarity::Legendary, "#FFB703"),
    ];

    entries
        .iter()
        .zip(0..)
        .map(|(&(key, name, price_coins, icon, rarity, color), sort_order)| Badge {
            badge_key: key.to_string(),
            name: name.to_string(),
            description: None,
            price_coins,
            icon: icon.to_string(),
            rarity,
            color: color.to_string(),
            sort_order,
        })
        .collect()
}

impl MemorySpinStore {
    pub fn new(rewards: Vec<RewardRow>, tasks: Vec<DailyTask>) -> Self {
        Self {
            rewards,
            tasks,
            badges: Vec::new(),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Store with the given wheel and tasks and the starter badges on sale.
    pub fn with_catalog(catalog: &RewardCatalog, tasks: Vec<DailyTask>) -> Self {
        Self::new(catalog.rewards().iter().map(RewardRow::from).collect(), tasks).with_badges(starter_badges())
    }

    pub fn with_badges(mut self, mut badges: Vec<Badge>) -> Self {
        badges.sort_by_key(|b| b.sort_order);
        self.badges = badges;
        self
    }

    /// Credits keys outside of the claim flow (seeding, admin grants).
    pub async fn grant_kitty_keys(&self, user_id: Uuid, amount: i64) -> Result<KittyKeyWallet, StoreError> {
        let mut ledger = self.ledger.lock().await;
        let wallet = ledger.keys.entry(user_id).or_default();
        wallet.earn(amount)?;
        Ok(*wallet)
    }

    fn progress_for(ledger: &Ledger, user_id: Uuid, day: NaiveDate) -> Vec<TaskProgress> {
        ledger
            .progress
            .iter()
            .filter(|((user, date, _), _)| *user == user_id && *date == day)
            .map(|(_, progress)| progress.clone())
            .collect()
    }
}

#[async_trait]
impl SpinStore for MemorySpinStore {
    async fn active_rewards(&self) -> Result<Vec<RewardRow>, StoreError> {
        let mut rows: Vec<RewardRow> = self.rewards.iter().filter(|r| r.is_active).cloned().collect();
        rows.sort_by_key(|r| r.sort_order);
        Ok(rows)
    }

    async fn kitty_keys(&self, user_id: Uuid) -> Result<KittyKeyWallet, StoreError> {
        let ledger = self.ledger.lock().await;
        Ok(ledger.keys.get(&user_id).copied().unwrap_or_default())
    }

    async fn coins(&self, user_id: Uuid) -> Result<CoinWallet, StoreError> {
        let ledger = self.ledger.lock().await;
        Ok(ledger.coins.get(&user_id).copied().unwrap_or_default())
    }

    async fn spin_attempts_on(&self, user_id: Uuid, day: NaiveDate) -> Result<Vec<SpinAttempt>, StoreError> {
        let ledger = self.ledger.lock().await;
        let mut attempts: Vec<SpinAttempt> = ledger
            .attempts
            .get(&user_id)
            .map(|all| all.iter().filter(|a| a.spin_date == day).cloned().collect())
            .unwrap_or_default();
        attempts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(attempts)
    }

    async fn commit_spin(
        &self,
        user_id: Uuid,
        reward: &Reward,
        now: DateTime<Utc>,
    ) -> Result<SpinReceipt, StoreError> {
        let mut ledger = self.ledger.lock().await;

        // Work on copies so a failure leaves the ledger as it was.
        let mut keys = ledger.keys.get(&user_id).copied().unwrap_or_default();
        let mut coins = ledger.coins.get(&user_id).copied().unwrap_or_default();
        keys.spend(SPIN_COST_KEYS)?;
        coins.credit(i64::from(reward.coin_amount))?;

        let attempt = SpinAttempt {
            id: Uuid::new_v4().to_string(),
            reward_id: reward.id.clone(),
            coins_won: i64::from(reward.coin_amount),
            spin_date: task_day(now),
            created_at: now,
        };

        ledger.keys.insert(user_id, keys);
        ledger.coins.insert(user_id, coins);
        ledger.attempts.entry(user_id).or_default().push(attempt.clone());

        Ok(SpinReceipt {
            attempt,
            kitty_keys: keys,
            coins,
        })
    }

    async fn daily_tasks(&self) -> Result<Vec<DailyTask>, StoreError> {
        Ok(self.tasks.clone())
    }

    async fn task_progress(&self, user_id: Uuid, day: NaiveDate) -> Result<Vec<TaskProgress>, StoreError> {
        let ledger = self.ledger.lock().await;
        Ok(Self::progress_for(&ledger, user_id, day))
    }

    async fn has_claimed_key(&self, user_id: Uuid, day: NaiveDate) -> Result<bool, StoreError> {
        let ledger = self.ledger.lock().await;
        Ok(ledger.claims.contains(&(user_id, day)))
    }

    async fn record_task_progress(
        &self,
        user_id: Uuid,
        task_key: &str,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<ProgressUpdate, StoreError> {
        let task = self
            .tasks
            .iter()
            .find(|t| t.task_key == task_key)
            .ok_or_else(|| TaskError::UnknownTask(task_key.to_string()))?;
        let day = task_day(now);
        let key = (user_id, day, task_key.to_string());

        let mut ledger = self.ledger.lock().await;
        let current = ledger
            .progress
            .get(&key)
            .cloned()
            .unwrap_or_else(|| TaskProgress::empty(task_key, day));
        let update = current.apply(task, amount, now)?;

        let mut coins = ledger.coins.get(&user_id).copied().unwrap_or_default();
        coins.credit(update.reward_coins)?;

        ledger.coins.insert(user_id, coins);
        ledger.progress.insert(key, update.progress.clone());
        Ok(update)
    }

    async fn claim_kitty_key(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<KittyKeyWallet, StoreError> {
        let day = task_day(now);
        let mut ledger = self.ledger.lock().await;

        let progress = Self::progress_for(&ledger, user_id, day);
        let claimed = ledger.claims.contains(&(user_id, day));
        let eligibility = ClaimEligibility::evaluate(&self.tasks, &progress, claimed);
        if !eligibility.is_eligible() {
            return Err(StoreError::NotEligible(eligibility));
        }

        let mut keys = ledger.keys.get(&user_id).copied().unwrap_or_default();
        keys.earn(KITTY_KEYS_PER_CLAIM)?;
        ledger.keys.insert(user_id, keys);
        ledger.claims.insert((user_id, day));
        Ok(keys)
    }

    async fn badges(&self) -> Result<Vec<Badge>, StoreError> {
        Ok(self.badges.clone())
    }

    async fn owned_badges(&self, user_id: Uuid) -> Result<Vec<OwnedBadge>, StoreError> {
        let ledger = self.ledger.lock().await;
        Ok(ledger.badges.get(&user_id).cloned().unwrap_or_default())
    }

    async fn purchase_badge(
        &self,
        user_id: Uuid,
        badge_key: &str,
        now: DateTime<Utc>,
    ) -> Result<BadgePurchase, StoreError> {
        let badge = self
            .badges
            .iter()
            .find(|b| b.badge_key == badge_key)
            .ok_or_else(|| BadgeError::UnknownBadge(badge_key.to_string()))?;

        let mut ledger = self.ledger.lock().await;
        let owned = ledger
            .badges
            .get(&user_id)
            .is_some_and(|all| all.iter().any(|o| o.badge_key == badge_key));
        let price = badge.purchase_price(owned)?;

        let mut coins = ledger.coins.get(&user_id).copied().unwrap_or_default();
        coins.debit(price)?;

        let purchase = OwnedBadge {
            badge_key: badge_key.to_string(),
            purchased_at: now,
        };
        ledger.coins.insert(user_id, coins);
        ledger.badges.entry(user_id).or_default().push(purchase.clone());

        Ok(BadgePurchase { badge: purchase, coins })
    }
}
