use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use clap::Parser;
use rusqlite::params;
use serde_json::json;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use fanthread::auth;
use fanthread::config::{Cli, Config};
use fanthread::db;
use fanthread::error::{AppError, AppResult};
use fanthread::routes;
use fanthread::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(config.db_path())?;
    db::run_migrations(&pool)?;

    let state = AppState::sqlite(pool, config.clone());

    // Test-only seed endpoint: creates a profile + session, returns session cookie
    let mut seed = axum::Router::new();
    if std::env::var("FANTHREAD_TEST_SEED").is_ok() {
        tracing::warn!("FANTHREAD_TEST_SEED set, mounting /test/seed");
        seed = seed.route("/test/seed", get(test_seed));
    }

    let app = routes::app(state.clone()).merge(seed.with_state(state));

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Test-only: seed a profile + session and return the session cookie.
/// Only mounted when FANTHREAD_TEST_SEED env var is set.
async fn test_seed(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let uid = {
        let conn = state.db.get().map_err(|e| AppError::Internal(e.to_string()))?;
        conn.execute(
            "INSERT OR IGNORE INTO profiles (id, username) VALUES (?1, 'testuser')",
            params![uuid::Uuid::now_v7().to_string()],
        )
        .map_err(|e| AppError::Internal(e.to_string()))?;

        // May already exist from a previous seed call
        conn.query_row(
            "SELECT id FROM profiles WHERE username = 'testuser'",
            [],
            |r| r.get::<_, String>(0),
        )
        .map_err(|e| AppError::Internal(e.to_string()))?
    };

    let token = auth::create_session(&state.db, &uid, state.config.auth.session_hours)?;

    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age=3600",
        state.config.auth.cookie_name, token
    );

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "user_id": uid, "username": "testuser", "token": token })),
    ))
}
