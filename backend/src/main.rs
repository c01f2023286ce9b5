use std::net::SocketAddr;

use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, Level};

mod auth;
mod db;
mod domain;
mod error;
mod excel;
mod rest;

use auth::JwtKeys;
use db::DbConnection;
use rest::AppState;

const TOKEN_TTL_SECS: i64 = 8 * 60 * 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Setting up database");
    let db = DbConnection::init().await?;

    let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| "change-me-in-production".to_string());
    let state = AppState::new(db, JwtKeys::new(&secret), TOKEN_TTL_SECS);

    // The console is reachable on a fresh database through a seeded admin.
    state.auth.seed_admin_if_empty().await?;

    let cors = CorsLayer::new()
        .allow_origin("http://localhost:8080".parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api/v1", rest::create_router(state))
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
