use axum::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dino_shared::badges::{Badge, BadgeError, OwnedBadge};
use dino_shared::constants::{KITTY_KEYS_PER_CLAIM, SPIN_COST_KEYS};
use dino_shared::daily_tasks::{
    task_day, ClaimEligibility, DailyTask, ProgressUpdate, TaskError, TaskProgress, TaskType,
};
use dino_shared::reward::{Rarity, Reward, RewardRow};
use dino_shared::spin_api::SpinAttempt;
use dino_shared::wallet::{CoinWallet, KittyKeyWallet};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{BadgePurchase, SpinReceipt, SpinStore, StoreError};

#[derive(sqlx::FromRow)]
struct RewardRecord {
    id: String,
    name: String,
    coin_amount: i64,
    rarity: String,
    probability: f64,
    color: String,
    sort_order: i32,
    is_active: bool,
}

impl From<RewardRecord> for RewardRow {
    fn from(r: RewardRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            coin_amount: r.coin_amount,
            rarity: r.rarity,
            probability: r.probability,
            color: r.color,
            sort_order: r.sort_order,
            is_active: r.is_active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct WalletRecord {
    balance: i64,
    total_earned: i64,
    total_spent: i64,
}

impl From<WalletRecord> for KittyKeyWallet {
    fn from(r: WalletRecord) -> Self {
        Self {
            balance: r.balance,
            total_earned: r.total_earned,
            total_spent: r.total_spent,
        }
    }
}

impl From<WalletRecord> for CoinWallet {
    fn from(r: WalletRecord) -> Self {
        Self {
            balance: r.balance,
            total_earned: r.total_earned,
            total_spent: r.total_spent,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AttemptRecord {
    id: Uuid,
    reward_id: String,
    coins_won: i64,
    spin_date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl From<AttemptRecord> for SpinAttempt {
    fn from(r: AttemptRecord) -> Self {
        Self {
            id: r.id.to_string(),
            reward_id: r.reward_id,
            coins_won: r.coins_won,
            spin_date: r.spin_date,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TaskRecord {
    task_key: String,
    title: String,
    description: Option<String>,
    task_type: String,
    target_value: i64,
    reward_coins: i64,
}

impl TryFrom<TaskRecord> for DailyTask {
    type Error = StoreError;

    fn try_from(r: TaskRecord) -> Result<Self, Self::Error> {
        let task_type = TaskType::parse(&r.task_type)
            .ok_or_else(|| StoreError::Corrupt(format!("task {} has unknown type {:?}", r.task_key, r.task_type)))?;
        Ok(Self {
            task_key: r.task_key,
            title: r.title,
            description: r.description,
            task_type,
            target_value: r.target_value,
            reward_coins: r.reward_coins,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProgressRecord {
    task_key: String,
    progress_value: i64,
    is_completed: bool,
    completed_at: Option<DateTime<Utc>>,
    task_date: NaiveDate,
}

impl From<ProgressRecord> for TaskProgress {
    fn from(r: ProgressRecord) -> Self {
        Self {
            task_key: r.task_key,
            progress_value: r.progress_value,
            is_completed: r.is_completed,
            completed_at: r.completed_at,
            task_date: r.task_date,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BadgeRecord {
    badge_key: String,
    name: String,
    description: Option<String>,
    price_coins: i64,
    icon: String,
    rarity: String,
    color: String,
    sort_order: i32,
}

impl TryFrom<BadgeRecord> for Badge {
    type Error = StoreError;

    fn try_from(r: BadgeRecord) -> Result<Self, Self::Error> {
        let rarity: Rarity = r
            .rarity
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("badge {}: {}", r.badge_key, e)))?;
        Ok(Self {
            badge_key: r.badge_key,
            name: r.name,
            description: r.description,
            price_coins: r.price_coins,
            icon: r.icon,
            rarity,
            color: r.color,
            sort_order: r.sort_order,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OwnedBadgeRecord {
    badge_key: String,
    purchased_at: DateTime<Utc>,
}

impl From<OwnedBadgeRecord> for OwnedBadge {
    fn from(r: OwnedBadgeRecord) -> Self {
        Self {
            badge_key: r.badge_key,
            purchased_at: r.purchased_at,
        }
    }
}

const BADGE_COLUMNS: &str = "badge_key, name, description, price_coins, icon, rarity, color, sort_order";

const ACTIVE_TASKS: &str = r#"
    SELECT task_key, title, description, task_type, target_value, reward_coins
    FROM daily_tasks
    WHERE is_active = TRUE
    ORDER BY task_type ASC, target_value ASC
"#;

const PROGRESS_FOR_DAY: &str = r#"
    SELECT task_key, progress_value, is_completed, completed_at, task_date
    FROM user_daily_progress
    WHERE user_id = $1 AND task_date = $2
"#;

/// Postgres backed store. Wallet rows are locked with `SELECT ... FOR UPDATE` so
/// concurrent spins for one user are serialized by the database.
#[derive(Clone)]
pub struct PgSpinStore {
    pool: PgPool,
}

impl PgSpinStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn lock_kitty_keys(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> Result<KittyKeyWallet, StoreError> {
        sqlx::query("INSERT INTO user_kitty_keys (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;

        let record: WalletRecord = sqlx::query_as(
            "SELECT balance, total_earned, total_spent FROM user_kitty_keys WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(record.into())
    }

    async fn store_kitty_keys(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        wallet: &KittyKeyWallet,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE user_kitty_keys
            SET balance = $2, total_earned = $3, total_spent = $4, updated_at = now()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(wallet.balance)
        .bind(wallet.total_earned)
        .bind(wallet.total_spent)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn credit_coins(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        amount: i64,
    ) -> Result<CoinWallet, StoreError> {
        let record: WalletRecord = sqlx::query_as(
            r#"
            INSERT INTO user_coins (user_id, balance, total_earned)
            VALUES ($1, $2, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET balance = user_coins.balance + EXCLUDED.balance,
                total_earned = user_coins.total_earned + EXCLUDED.total_earned,
                updated_at = now()
            RETURNING balance, total_earned, total_spent
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(&mut **tx)
        .await?;
        Ok(record.into())
    }

    async fn lock_coins(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> Result<CoinWallet, StoreError> {
        sqlx::query("INSERT INTO user_coins (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;

        let record: WalletRecord = sqlx::query_as(
            "SELECT balance, total_earned, total_spent FROM user_coins WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(record.into())
    }

    async fn store_coins(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        wallet: &CoinWallet,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE user_coins
            SET balance = $2, total_earned = $3, total_spent = $4, updated_at = now()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(wallet.balance)
        .bind(wallet.total_earned)
        .bind(wallet.total_spent)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn active_tasks(conn: &mut PgConnection) -> Result<Vec<DailyTask>, StoreError> {
        let records: Vec<TaskRecord> = sqlx::query_as(ACTIVE_TASKS).fetch_all(conn).await?;
        records.into_iter().map(DailyTask::try_from).collect()
    }

    async fn progress_on(conn: &mut PgConnection, user_id: Uuid, day: NaiveDate) -> Result<Vec<TaskProgress>, StoreError> {
        let records: Vec<ProgressRecord> = sqlx::query_as(PROGRESS_FOR_DAY)
            .bind(user_id)
            .bind(day)
            .fetch_all(conn)
            .await?;
        Ok(records.into_iter().map(TaskProgress::from).collect())
    }
}

#[async_trait]
impl SpinStore for PgSpinStore {
    async fn active_rewards(&self) -> Result<Vec<RewardRow>, StoreError> {
        let records: Vec<RewardRecord> = sqlx::query_as(
            r#"
            SELECT id, name, coin_amount, rarity, probability, color, sort_order, is_active
            FROM spin_wheel_rewards
            WHERE is_active = TRUE
            ORDER BY sort_order ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records.into_iter().map(RewardRow::from).collect())
    }

    async fn kitty_keys(&self, user_id: Uuid) -> Result<KittyKeyWallet, StoreError> {
        let record: Option<WalletRecord> = sqlx::query_as(
            "SELECT balance, total_earned, total_spent FROM user_kitty_keys WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record.map(KittyKeyWallet::from).unwrap_or_default())
    }

    async fn coins(&self, user_id: Uuid) -> Result<CoinWallet, StoreError> {
        let record: Option<WalletRecord> = sqlx::query_as(
            "SELECT balance, total_earned, total_spent FROM user_coins WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record.map(CoinWallet::from).unwrap_or_default())
    }

    async fn spin_attempts_on(&self, user_id: Uuid, day: NaiveDate) -> Result<Vec<SpinAttempt>, StoreError> {
        let records: Vec<AttemptRecord> = sqlx::query_as(
            r#"
            SELECT id, reward_id, coins_won, spin_date, created_at
            FROM user_spin_attempts
            WHERE user_id = $1 AND spin_date = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(day)
        .fetch_all(&self.pool)
        .await?;
        Ok(records.into_iter().map(SpinAttempt::from).collect())
    }

    async fn commit_spin(
        &self,
        user_id: Uuid,
        reward: &Reward,
        now: DateTime<Utc>,
    ) -> Result<SpinReceipt, StoreError> {
        let mut tx = self.pool.begin().await?;

        // An early return drops `tx`, which rolls everything back.
        let mut keys = Self::lock_kitty_keys(&mut tx, user_id).await?;
        keys.spend(SPIN_COST_KEYS)?;
        Self::store_kitty_keys(&mut tx, user_id, &keys).await?;

        let attempt: AttemptRecord = sqlx::query_as(
            r#"
            INSERT INTO user_spin_attempts (id, user_id, reward_id, coins_won, spin_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, reward_id, coins_won, spin_date, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&reward.id)
        .bind(i64::from(reward.coin_amount))
        .bind(task_day(now))
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let coins = Self::credit_coins(&mut tx, user_id, i64::from(reward.coin_amount)).await?;

        tx.commit().await?;

        Ok(SpinReceipt {
            attempt: attempt.into(),
            kitty_keys: keys,
            coins,
        })
    }

    async fn daily_tasks(&self) -> Result<Vec<DailyTask>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::active_tasks(&mut conn).await
    }

    async fn task_progress(&self, user_id: Uuid, day: NaiveDate) -> Result<Vec<TaskProgress>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::progress_on(&mut conn, user_id, day).await
    }

    async fn has_claimed_key(&self, user_id: Uuid, day: NaiveDate) -> Result<bool, StoreError> {
        let claimed: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_kitty_key_claims WHERE user_id = $1 AND claim_date = $2)",
        )
        .bind(user_id)
        .bind(day)
        .fetch_one(&self.pool)
        .await?;
        Ok(claimed)
    }

    async fn record_task_progress(
        &self,
        user_id: Uuid,
        task_key: &str,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<ProgressUpdate, StoreError> {
        let day = task_day(now);
        let mut tx = self.pool.begin().await?;

        let record: Option<TaskRecord> = sqlx::query_as(
            r#"
            SELECT task_key, title, description, task_type, target_value, reward_coins
            FROM daily_tasks
            WHERE task_key = $1 AND is_active = TRUE
            "#,
        )
        .bind(task_key)
        .fetch_optional(&mut *tx)
        .await?;
        let task = DailyTask::try_from(record.ok_or_else(|| TaskError::UnknownTask(task_key.to_string()))?)?;

        // Make sure the row exists so that FOR UPDATE has something to lock.
        sqlx::query(
            r#"
            INSERT INTO user_daily_progress (user_id, task_key, task_date)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, task_key, task_date) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(task_key)
        .bind(day)
        .execute(&mut *tx)
        .await?;

        let current: ProgressRecord = sqlx::query_as(
            r#"
            SELECT task_key, progress_value, is_completed, completed_at, task_date
            FROM user_daily_progress
            WHERE user_id = $1 AND task_key = $2 AND task_date = $3
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(task_key)
        .bind(day)
        .fetch_one(&mut *tx)
        .await?;

        let update = TaskProgress::from(current).apply(&task, amount, now)?;

        sqlx::query(
            r#"
            UPDATE user_daily_progress
            SET progress_value = $4, is_completed = $5, completed_at = $6
            WHERE user_id = $1 AND task_key = $2 AND task_date = $3
            "#,
        )
        .bind(user_id)
        .bind(task_key)
        .bind(day)
        .bind(update.progress.progress_value)
        .bind(update.progress.is_completed)
        .bind(update.progress.completed_at)
        .execute(&mut *tx)
        .await?;

        if update.reward_coins > 0 {
            Self::credit_coins(&mut tx, user_id, update.reward_coins).await?;
        }

        tx.commit().await?;
        Ok(update)
    }

    async fn claim_kitty_key(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<KittyKeyWallet, StoreError> {
        let day = task_day(now);
        let mut tx = self.pool.begin().await?;

        // Locking the wallet first serializes concurrent claims for this user.
        let mut keys = Self::lock_kitty_keys(&mut tx, user_id).await?;

        let tasks = Self::active_tasks(&mut *tx).await?;
        let progress = Self::progress_on(&mut *tx, user_id, day).await?;
        let claimed: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_kitty_key_claims WHERE user_id = $1 AND claim_date = $2)",
        )
        .bind(user_id)
        .bind(day)
        .fetch_one(&mut *tx)
        .await?;

        let eligibility = ClaimEligibility::evaluate(&tasks, &progress, claimed);
        if !eligibility.is_eligible() {
            return Err(StoreError::NotEligible(eligibility));
        }

        sqlx::query("INSERT INTO user_kitty_key_claims (user_id, claim_date, created_at) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(day)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        keys.earn(KITTY_KEYS_PER_CLAIM)?;
        Self::store_kitty_keys(&mut tx, user_id, &keys).await?;

        tx.commit().await?;
        Ok(keys)
    }

    async fn badges(&self) -> Result<Vec<Badge>, StoreError> {
        let records: Vec<BadgeRecord> = sqlx::query_as(&format!(
            "SELECT {} FROM badge_store WHERE is_active = TRUE ORDER BY sort_order ASC",
            BADGE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        records.into_iter().map(Badge::try_from).collect()
    }

    async fn owned_badges(&self, user_id: Uuid) -> Result<Vec<OwnedBadge>, StoreError> {
        let records: Vec<OwnedBadgeRecord> = sqlx::query_as(
            "SELECT badge_key, purchased_at FROM user_badges WHERE user_id = $1 ORDER BY purchased_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records.into_iter().map(OwnedBadge::from).collect())
    }

    async fn purchase_badge(
        &self,
        user_id: Uuid,
        badge_key: &str,
        now: DateTime<Utc>,
    ) -> Result<BadgePurchase, StoreError> {
        let mut tx = self.pool.begin().await?;

        let record: Option<BadgeRecord> = sqlx::query_as(&format!(
            "SELECT {} FROM badge_store WHERE badge_key = $1 AND is_active = TRUE",
            BADGE_COLUMNS
        ))
        .bind(badge_key)
        .fetch_optional(&mut *tx)
        .await?;
        let badge = Badge::try_from(record.ok_or_else(|| BadgeError::UnknownBadge(badge_key.to_string()))?)?;

        // The coin row lock serializes purchases by the same user.
        let mut coins = Self::lock_coins(&mut tx, user_id).await?;
        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_badges WHERE user_id = $1 AND badge_key = $2)",
        )
        .bind(user_id)
        .bind(badge_key)
        .fetch_one(&mut *tx)
        .await?;

        coins.debit(badge.purchase_price(owned)?)?;
        Self::store_coins(&mut tx, user_id, &coins).await?;

        let purchase: OwnedBadgeRecord = sqlx::query_as(
            r#"
            INSERT INTO user_badges (user_id, badge_key, purchased_at)
            VALUES ($1, $2, $3)
            RETURNING badge_key, purchased_at
            "#,
        )
        .bind(user_id)
        .bind(badge_key)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(BadgePurchase {
            badge: purchase.into(),
            coins,
        })
    }
}
