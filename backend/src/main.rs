use dino_backend::config::Config;
use dino_backend::{app, build_store, logging, AppState};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::from_path(".env").ok();
    logging::setup()?;

    let config = Config::from_env()?;
    let store = build_store(&config).await?;
    let state = AppState::new(store, &config.jwt_secret);
    let app = app(state, &config.cors_origins);

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
