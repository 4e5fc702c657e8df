//! Badge store rules. Badges are bought once with coins and kept forever.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reward::Rarity;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BadgeError {
    #[error("badge {0:?} does not exist or is inactive")]
    UnknownBadge(String),
    #[error("badge {0:?} is already owned")]
    AlreadyOwned(String),
    #[error("badge {0:?} cannot be bought with coins")]
    NotForSale(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Badge {
    pub badge_key: String,
    pub name: String,
    pub description: Option<String>,
    /// Zero for badges that come with a subscription and are never sold.
    pub price_coins: i64,
    pub icon: String,
    pub rarity: Rarity,
    pub color: String,
    pub sort_order: i32,
}

impl Badge {
    /// Coins to charge for this badge, or why it cannot be bought.
    pub fn purchase_price(&self, already_owned: bool) -> Result<i64, BadgeError> {
        if self.price_coins <= 0 {
            return Err(BadgeError::NotForSale(self.badge_key.clone()));
        }
        if already_owned {
            return Err(BadgeError::AlreadyOwned(self.badge_key.clone()));
        }
        Ok(self.price_coins)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OwnedBadge {
    pub badge_key: String,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BadgeWithOwnership {
    #[serde(flatten)]
    pub badge: Badge,
    pub owned: bool,
    pub purchased_at: Option<DateTime<Utc>>,
}

pub fn with_ownership(badges: &[Badge], owned: &[OwnedBadge]) -> Vec<BadgeWithOwnership> {
    badges
        .iter()
        .map(|badge| {
            let purchase = owned.iter().find(|o| o.badge_key == badge.badge_key);
            BadgeWithOwnership {
                badge: badge.clone(),
                owned: purchase.is_some(),
                purchased_at: purchase.map(|o| o.purchased_at),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn badge(key: &str, price_coins: i64) -> Badge {
        Badge {
            badge_key: key.to_string(),
            name: key.to_uppercase(),
            description: None,
            price_coins,
            icon: "⭐".to_string(),
            rarity: Rarity::Rare,
            color: "#FFD93D".to_string(),
            sort_order: 0,
        }
    }

    #[test]
    fn test_purchase_price() {
        assert_eq!(badge("star", 150).purchase_price(false), Ok(150));
        assert_eq!(
            badge("star", 150).purchase_price(true),
            Err(BadgeError::AlreadyOwned("star".to_string()))
        );
        assert_eq!(
            badge("telegram", 0).purchase_price(false),
            Err(BadgeError::NotForSale("telegram".to_string()))
        );
    }

    #[test]
    fn test_ownership_is_attached() {
        let bought = Utc.with_ymd_and_hms(2024, 8, 1, 10, 0, 0).unwrap();
        let badges = vec![badge("star", 150), badge("moon", 300)];
        let owned = vec![OwnedBadge { badge_key: "moon".to_string(), purchased_at: bought }];

        let view = with_ownership(&badges, &owned);
        assert!(!view[0].owned);
        assert_eq!(view[0].purchased_at, None);
        assert!(view[1].owned);
        assert_eq!(view[1].purchased_at, Some(bought));

        let json = serde_json::to_value(&view[1]).unwrap();
        assert_eq!(json["badge_key"], "moon");
        assert_eq!(json["owned"], true);
    }
}
