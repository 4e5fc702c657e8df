use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::constants::DEFAULT_REWARD_COLOR;
use crate::draw::{self, DrawError, Drawn};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("reward catalog has no active rewards")]
    Empty,
    #[error("every reward in the catalog has zero probability")]
    NoReachableReward,
    #[error("reward probabilities add up to a non-finite total")]
    TotalWeightOverflow,
    #[error("reward {id:?} is invalid: {reason}")]
    InvalidReward { id: String, reason: String },
    #[error("reward catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Display tier of a reward. Has no effect on selection.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rarity {
    type Err = String;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        match label.trim().to_ascii_lowercase().as_str() {
            "common" => Ok(Self::Common),
            "rare" => Ok(Self::Rare),
            "epic" => Ok(Self::Epic),
            "legendary" => Ok(Self::Legendary),
            other => Err(format!("unknown rarity {:?}", other)),
        }
    }
}

/// One validated spin wheel entry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Reward {
    pub id: String,
    pub name: String,
    pub coin_amount: u32,
    pub rarity: Rarity,
    pub probability: f64,
    pub color: String,
    pub sort_order: i32,
}

/// A reward as it is stored in `spin_wheel_rewards` or written in a catalog file.
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct RewardRow {
    #[validate(length(min = 1, max = 64))]
    pub id: String,
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    pub coin_amount: i64,
    pub rarity: String,
    pub probability: f64,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_color() -> String {
    DEFAULT_REWARD_COLOR.to_string()
}

fn default_active() -> bool {
    true
}

impl TryFrom<RewardRow> for Reward {
    type Error = CatalogError;

    fn try_from(row: RewardRow) -> Result<Self, Self::Error> {
        let invalid = |reason: String| CatalogError::InvalidReward {
            id: row.id.clone(),
            reason,
        };

        row.validate().map_err(|e| invalid(e.to_string()))?;

        let coin_amount = u32::try_from(row.coin_amount)
            .map_err(|_| invalid(format!("coin amount {} is out of range", row.coin_amount)))?;
        let rarity = row.rarity.parse::<Rarity>().map_err(invalid)?;

        // Zero is allowed (unreachable entry), negative or non-finite weights are not.
        if !row.probability.is_finite() || row.probability < 0.0 {
            return Err(invalid(format!("probability {} must be a finite non-negative number", row.probability)));
        }

        Ok(Self {
            coin_amount,
            rarity,
            probability: row.probability,
            id: row.id,
            name: row.name,
            color: row.color,
            sort_order: row.sort_order,
        })
    }
}

impl From<&Reward> for RewardRow {
    fn from(reward: &Reward) -> Self {
        Self {
            id: reward.id.clone(),
            name: reward.name.clone(),
            coin_amount: i64::from(reward.coin_amount),
            rarity: reward.rarity.to_string(),
            probability: reward.probability,
            color: reward.color.clone(),
            sort_order: reward.sort_order,
            is_active: true,
        }
    }
}

/// The ordered set of rewards eligible for one draw session.
///
/// Always non-empty and always holds at least one reward with a positive weight.
/// The order here is the order of the wheel segments.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(transparent)]
pub struct RewardCatalog {
    rewards: Vec<Reward>,
}

impl RewardCatalog {
    /// Builds a catalog from store rows: inactive rows are dropped and the rest are
    /// ordered by `sort_order` (ties keep their incoming order).
    pub fn from_rows<I>(rows: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = RewardRow>,
    {
        let mut rewards = rows
            .into_iter()
            .filter(|row| row.is_active)
            .map(Reward::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        rewards.sort_by_key(|reward| reward.sort_order);
        Self::new(rewards)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let rows: Vec<RewardRow> = serde_json::from_str(json)?;
        Self::from_rows(rows)
    }

    pub fn new(rewards: Vec<Reward>) -> Result<Self, CatalogError> {
        if rewards.is_empty() {
            return Err(CatalogError::Empty);
        }
        if !rewards.iter().any(|r| r.probability > 0.0) {
            return Err(CatalogError::NoReachableReward);
        }
        let catalog = Self { rewards };
        if !catalog.total_weight().is_finite() {
            return Err(CatalogError::TotalWeightOverflow);
        }
        Ok(catalog)
    }

    /// The eight segment wheel used when no catalog has been configured.
    pub fn default_wheel() -> Self {
        let entries: [(&str, &str, u32, Rarity, f64, &str); 8] = [
            ("pita-pink", "Pita Pink", 5, Rarity::Common, 25.0, "#FFB6C1"),
            ("apel-merah", "Apel Merah", 10, Rarity::Common, 20.0, "#FF6B6B"),
            ("bintang-kecil", "Bintang Kecil", 15, Rarity::Common, 18.0, "#FFD93D"),
            ("kue-stroberi", "Kue Stroberi", 25, Rarity::Rare, 14.0, "#FF8FAB"),
            ("hati-manis", "Hati Manis", 50, Rarity::Rare, 10.0, "#C77DFF"),
            ("mahkota-kitty", "Mahkota Kitty", 100, Rarity::Epic, 7.0, "#7B2CBF"),
            ("pelangi-ajaib", "Pelangi Ajaib", 250, Rarity::Epic, 4.0, "#48CAE4"),
            ("jackpot-kitty", "Jackpot Kitty", 1000, Rarity::Legendary, 2.0, "#FFB703"),
        ];

        let rewards = entries
            .iter()
            .zip(0..)
            .map(|(&(id, name, coin_amount, rarity, probability, color), sort_order)| Reward {
                id: id.to_string(),
                name: name.to_string(),
                coin_amount,
                rarity,
                probability,
                color: color.to_string(),
                sort_order,
            })
            .collect();

        Self { rewards }
    }

    pub fn rewards(&self) -> &[Reward] {
        &self.rewards
    }

    /// Number of wheel segments, one per reward.
    pub fn segments(&self) -> usize {
        self.rewards.len()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.rewards.iter().position(|r| r.id == id)
    }

    pub fn total_weight(&self) -> f64 {
        self.rewards.iter().map(|r| r.probability).sum()
    }

    /// Normalized chance of the reward at `index` being drawn.
    pub fn share(&self, index: usize) -> Option<f64> {
        let reward = self.rewards.get(index)?;
        Some(reward.probability / self.total_weight())
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Drawn<'_>, DrawError> {
        draw::draw(&self.rewards, rng)
    }
}
