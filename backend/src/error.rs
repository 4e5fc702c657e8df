use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dino_shared::badges::BadgeError;
use dino_shared::constants::{
    ALREADY_CLAIMED_ERROR, BADGE_ALREADY_OWNED_ERROR, BADGE_NOT_FOR_SALE_ERROR, INSUFFICIENT_COINS_ERROR,
    NO_KITTY_KEYS_ERROR, TASKS_REMAINING_ERROR,
};
use dino_shared::daily_tasks::{ClaimEligibility, TaskError};
use dino_shared::draw::DrawError;
use dino_shared::reward::CatalogError;
use dino_shared::wallet::WalletError;
use dino_shared::wheel::WheelError;
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("spin wheel is not configured: {0}")]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Draw(#[from] DrawError),
    #[error(transparent)]
    Wheel(#[from] WheelError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Badge(#[from] BadgeError),
    #[error("not enough kitty keys")]
    InsufficientKeys,
    #[error("not enough coins")]
    InsufficientCoins,
    #[error("kitty key cannot be claimed: {0:?}")]
    NotEligible(ClaimEligibility),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Wallet(WalletError::InsufficientKeys { .. }) => Self::InsufficientKeys,
            StoreError::Wallet(WalletError::InsufficientCoins { .. }) => Self::InsufficientCoins,
            StoreError::Badge(e) => Self::Badge(e),
            StoreError::NotEligible(eligibility) => Self::NotEligible(eligibility),
            StoreError::Task(e) => Self::Task(e),
            other => Self::Store(other),
        }
    }
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Wheel(WheelError::InvalidRotation(_)) => {
                (StatusCode::BAD_REQUEST, "Invalid wheel rotation".to_string())
            }
            Self::Catalog(_) | Self::Draw(_) | Self::Wheel(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Spin wheel is not available right now".to_string(),
            ),
            Self::Task(TaskError::UnknownTask(key)) => {
                (StatusCode::NOT_FOUND, format!("Unknown task {}", key))
            }
            Self::Task(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::Badge(BadgeError::UnknownBadge(key)) => {
                (StatusCode::NOT_FOUND, format!("Unknown badge {}", key))
            }
            Self::Badge(BadgeError::AlreadyOwned(_)) => {
                (StatusCode::CONFLICT, BADGE_ALREADY_OWNED_ERROR.to_string())
            }
            Self::Badge(BadgeError::NotForSale(_)) => {
                (StatusCode::BAD_REQUEST, BADGE_NOT_FOR_SALE_ERROR.to_string())
            }
            Self::InsufficientKeys => (StatusCode::PAYMENT_REQUIRED, NO_KITTY_KEYS_ERROR.to_string()),
            Self::InsufficientCoins => (StatusCode::PAYMENT_REQUIRED, INSUFFICIENT_COINS_ERROR.to_string()),
            Self::NotEligible(ClaimEligibility::AlreadyClaimed) => {
                (StatusCode::CONFLICT, ALREADY_CLAIMED_ERROR.to_string())
            }
            Self::NotEligible(_) => (StatusCode::CONFLICT, TASKS_REMAINING_ERROR.to_string()),
            Self::Auth(AuthError::TokenExpired) => {
                (StatusCode::UNAUTHORIZED, "Token has expired".to_string())
            }
            Self::Auth(_) => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
            Self::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error processing request".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("request rejected: {}", self);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
