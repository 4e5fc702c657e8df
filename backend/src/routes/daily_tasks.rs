use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use dino_shared::daily_tasks::ProgressUpdate;
use dino_shared::spin_api::{ClaimResponse, DailyTasksResponse, TaskProgressRequest};
use dino_shared::wallet::KittyKeyWallet;

use crate::auth::UserId;
use crate::error::AppError;
use crate::services::task_service;
use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/daily-tasks", get(get_tasks))
        .route("/api/daily-tasks/progress", post(record_progress))
        .route("/api/kitty-keys", get(get_kitty_keys))
        .route("/api/kitty-keys/claim", post(claim_kitty_key))
}

async fn get_tasks(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<DailyTasksResponse>, AppError> {
    let overview = task_service::overview(state.store.as_ref(), user_id.0, Utc::now()).await?;
    Ok(Json(overview))
}

async fn record_progress(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Json(request): Json<TaskProgressRequest>,
) -> Result<Json<ProgressUpdate>, AppError> {
    let update = task_service::progress(state.store.as_ref(), user_id.0, &request, Utc::now()).await?;
    Ok(Json(update))
}

async fn get_kitty_keys(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<KittyKeyWallet>, AppError> {
    Ok(Json(state.store.kitty_keys(user_id.0).await?))
}

async fn claim_kitty_key(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<ClaimResponse>, AppError> {
    let response = task_service::claim_key(state.store.as_ref(), user_id.0, Utc::now()).await?;
    Ok(Json(response))
}
