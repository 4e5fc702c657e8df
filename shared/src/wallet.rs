use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::SPIN_COST_KEYS;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("not enough kitty keys: have {balance}, need {required}")]
    InsufficientKeys { balance: i64, required: i64 },
    #[error("not enough coins: have {balance}, need {required}")]
    InsufficientCoins { balance: i64, required: i64 },
    #[error("amount must be positive, got {0}")]
    InvalidAmount(i64),
}

fn check_amount(amount: i64) -> Result<(), WalletError> {
    if amount <= 0 {
        return Err(WalletError::InvalidAmount(amount));
    }
    Ok(())
}

/// Kitty keys held by one user. A missing record is the zero wallet.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct KittyKeyWallet {
    pub balance: i64,
    pub total_earned: i64,
    pub total_spent: i64,
}

impl KittyKeyWallet {
    pub fn can_spin(&self) -> bool {
        self.balance >= SPIN_COST_KEYS
    }

    pub fn spend(&mut self, amount: i64) -> Result<(), WalletError> {
        check_amount(amount)?;
        if self.balance < amount {
            return Err(WalletError::InsufficientKeys {
                balance: self.balance,
                required: amount,
            });
        }
        self.balance -= amount;
        self.total_spent += amount;
        Ok(())
    }

    pub fn earn(&mut self, amount: i64) -> Result<(), WalletError> {
        check_amount(amount)?;
        self.balance += amount;
        self.total_earned += amount;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoinWallet {
    pub balance: i64,
    pub total_earned: i64,
    pub total_spent: i64,
}

impl CoinWallet {
    /// Adds winnings. Crediting zero coins is a no-op rather than an error since
    /// catalogs may contain empty segments.
    pub fn credit(&mut self, amount: i64) -> Result<(), WalletError> {
        if amount == 0 {
            return Ok(());
        }
        check_amount(amount)?;
        self.balance += amount;
        self.total_earned += amount;
        Ok(())
    }

    pub fn debit(&mut self, amount: i64) -> Result<(), WalletError> {
        check_amount(amount)?;
        if self.balance < amount {
            return Err(WalletError::InsufficientCoins {
                balance: self.balance,
                required: amount,
            });
        }
        self.balance -= amount;
        self.total_spent += amount;
        Ok(())
    }
}
