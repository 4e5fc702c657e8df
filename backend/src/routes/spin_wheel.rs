use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use dino_shared::reward::Reward;
use dino_shared::spin_api::{SpinRequest, SpinResponse, SpinStatusResponse};
use rand::rngs::OsRng;

use crate::auth::UserId;
use crate::error::AppError;
use crate::services::spin_service;
use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/rewards", get(get_rewards))
        .route("/status", get(get_status))
        .route("/spin", post(spin_wheel))
}

async fn get_rewards(State(state): State<AppState>) -> Result<Json<Vec<Reward>>, AppError> {
    let catalog = spin_service::load_catalog(state.store.as_ref()).await?;
    Ok(Json(catalog.rewards().to_vec()))
}

async fn get_status(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<SpinStatusResponse>, AppError> {
    let status = spin_service::status(state.store.as_ref(), user_id.0, Utc::now()).await?;
    Ok(Json(status))
}

async fn spin_wheel(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Json(request): Json<SpinRequest>,
) -> Result<Json<SpinResponse>, AppError> {
    let mut rng = OsRng;
    let response = spin_service::spin(
        state.store.as_ref(),
        user_id.0,
        request.current_rotation,
        &mut rng,
        Utc::now(),
    )
    .await?;
    Ok(Json(response))
}
