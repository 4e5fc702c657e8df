use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{middleware, Router};
use dino_shared::reward::RewardCatalog;
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod services;
pub mod store;

use crate::config::Config;
use crate::store::memory::starter_tasks;
use crate::store::{MemorySpinStore, PgSpinStore, SpinStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SpinStore>,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<dyn SpinStore>, jwt_secret: &str) -> Self {
        Self {
            store,
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}

pub async fn health_check() -> impl IntoResponse {
    "OK"
}

/// Picks the store from configuration: Postgres when `DATABASE_URL` is set,
/// otherwise an in-memory store seeded from the catalog file or the built-in wheel.
pub async fn build_store(config: &Config) -> Result<Arc<dyn SpinStore>, Box<dyn std::error::Error>> {
    if let Some(url) = &config.database_url {
        let pool = PgPool::connect(url).await?;
        let store = PgSpinStore::new(pool);
        if config.run_migrations {
            info!("running database migrations");
            store.migrate().await?;
        }
        return Ok(Arc::new(store));
    }

    warn!("DATABASE_URL is not set, balances will only live in memory");
    let catalog = match &config.reward_catalog_path {
        Some(path) => {
            let json = tokio::fs::read_to_string(path).await?;
            let catalog = RewardCatalog::from_json(&json)?;
            info!("loaded {} rewards from {}", catalog.segments(), path.display());
            catalog
        }
        None => RewardCatalog::default_wheel(),
    };
    Ok(Arc::new(MemorySpinStore::with_catalog(&catalog, starter_tasks())))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

pub fn app(state: AppState, cors_origins: &[String]) -> Router {
    let protected_routes = Router::new()
        .nest("/api/spin-wheel", routes::spin_wheel::create_router())
        .merge(routes::daily_tasks::create_router())
        .merge(routes::badges::create_router())
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        .route("/api/health_check", get(health_check))
        .merge(protected_routes)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use dino_shared::reward::Reward;
    use dino_shared::spin_api::SpinResponse;
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "router-secret";

    fn test_app() -> (Router, Arc<MemorySpinStore>) {
        let store = Arc::new(MemorySpinStore::with_catalog(&RewardCatalog::default_wheel(), starter_tasks()));
        let state = AppState::new(store.clone(), SECRET);
        (app(state, &[]), store)
    }

    fn request(method: &str, uri: &str, user: Option<Uuid>, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("Authorization", format!("Bearer {}", auth::issue_token(user, SECRET, 600)));
        }
        match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check_is_public() {
        let (app, _) = test_app();
        let response = app.oneshot(request("GET", "/api/health_check", None, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_routes_need_a_token() {
        let (app, _) = test_app();
        let response = app
            .oneshot(request("GET", "/api/spin-wheel/rewards", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_rewards_are_listed_in_wheel_order() {
        let (app, _) = test_app();
        let response = app
            .oneshot(request("GET", "/api/spin-wheel/rewards", Some(Uuid::new_v4()), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let rewards: Vec<Reward> = serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(rewards, RewardCatalog::default_wheel().rewards().to_vec());
    }

    #[tokio::test]
    async fn test_spin_flow() {
        let (app, store) = test_app();
        let user = Uuid::new_v4();

        let response = app
            .clone()
            .oneshot(request("POST", "/api/spin-wheel/spin", Some(user), Some("{}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

        store.grant_kitty_keys(user, 1).await.unwrap();
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/spin-wheel/spin",
                Some(user),
                Some(r#"{"current_rotation": 45.0}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let spin: SpinResponse = serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(spin.kitty_keys.balance, 0);
        assert_eq!(spin.coins.balance, i64::from(spin.reward.coin_amount));

        let response = app
            .oneshot(request("GET", "/api/spin-wheel/status", Some(user), None))
            .await
            .unwrap();
        let status = json_body(response).await;
        assert_eq!(status["can_spin"], Value::Bool(false));
        assert_eq!(status["today_attempts"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_claim_flow() {
        let (app, _) = test_app();
        let user = Uuid::new_v4();

        let response = app
            .clone()
            .oneshot(request("POST", "/api/kitty-keys/claim", Some(user), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        for body in [
            r#"{"task_key": "daily_login", "amount": 1}"#,
            r#"{"task_key": "watch_30_minutes", "amount": 1800}"#,
            r#"{"task_key": "share_video", "amount": 1}"#,
        ] {
            let response = app
                .clone()
                .oneshot(request("POST", "/api/daily-tasks/progress", Some(user), Some(body)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .clone()
            .oneshot(request("POST", "/api/kitty-keys/claim", Some(user), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(request("GET", "/api/kitty-keys", Some(user), None))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["balance"], Value::from(1));
    }

    #[tokio::test]
    async fn test_badge_flow() {
        let (app, store) = test_app();
        let user = Uuid::new_v4();

        let response = app
            .clone()
            .oneshot(request("POST", "/api/badges/purchase", Some(user), Some(r#"{"badge_key": "kitty_fan"}"#)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

        store.grant_kitty_keys(user, 1).await.unwrap();
        let jackpot = RewardCatalog::default_wheel().rewards()[7].clone();
        store.commit_spin(user, &jackpot, chrono::Utc::now()).await.unwrap();

        let response = app
            .clone()
            .oneshot(request("POST", "/api/badges/purchase", Some(user), Some(r#"{"badge_key": "kitty_fan"}"#)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(request("GET", "/api/coins", Some(user), None))
            .await
            .unwrap();
        let coins = json_body(response).await;
        assert_eq!(coins["balance"], Value::from(900));
        assert_eq!(coins["total_spent"], Value::from(100));

        let response = app
            .oneshot(request("GET", "/api/badges", Some(user), None))
            .await
            .unwrap();
        let front = json_body(response).await;
        assert_eq!(front["badges"][0]["badge_key"], "kitty_fan");
        assert_eq!(front["badges"][0]["owned"], Value::Bool(true));
        assert_eq!(front["badges"][1]["owned"], Value::Bool(false));
    }

    #[tokio::test]
    async fn test_unknown_task_is_not_found() {
        let (app, _) = test_app();
        let response = app
            .oneshot(request(
                "POST",
                "/api/daily-tasks/progress",
                Some(Uuid::new_v4()),
                Some(r#"{"task_key": "nope", "amount": 1}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
