use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use dino_shared::spin_api::{BadgePurchaseResponse, BadgeStoreResponse, PurchaseBadgeRequest};
use dino_shared::wallet::CoinWallet;

use crate::auth::UserId;
use crate::error::AppError;
use crate::services::badge_service;
use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/coins", get(get_coins))
        .route("/api/badges", get(get_badges))
        .route("/api/badges/purchase", post(purchase_badge))
}

async fn get_coins(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<CoinWallet>, AppError> {
    Ok(Json(state.store.coins(user_id.0).await?))
}

async fn get_badges(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<BadgeStoreResponse>, AppError> {
    let response = badge_service::store_front(state.store.as_ref(), user_id.0).await?;
    Ok(Json(response))
}

async fn purchase_badge(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Json(request): Json<PurchaseBadgeRequest>,
) -> Result<Json<BadgePurchaseResponse>, AppError> {
    let response = badge_service::purchase(state.store.as_ref(), user_id.0, &request, Utc::now()).await?;
    Ok(Json(response))
}
