mod handlers;
mod metrics;
mod routes;

use axum::Router;
use codeforge_common::config::EvalConfig;
use codeforge_judge::client::Judge0Client;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub redis: ConnectionManager,
    pub judge: Judge0Client,
    pub config: EvalConfig,
}

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("CodeForge API booting...");

    // Connect to Redis
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

    let client = redis::Client::open(redis_url.as_str()).expect("Failed to create Redis client");

    let redis_conn = ConnectionManager::new(client)
        .await
        .expect("Failed to connect to Redis");

    info!("Connected to Redis: {}", redis_url);

    let config = EvalConfig::from_env();
    info!("Judge service: {}", config.judge_url);
    let judge = Judge0Client::new(&config);

    let state = Arc::new(AppState {
        redis: redis_conn,
        judge,
        config,
    });

    // Build router
    let app = Router::new().merge(routes::routes()).with_state(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    info!("HTTP server listening on {}", addr);
    info!("Ready to evaluate submissions");

    axum::serve(listener, app).await.expect("Server error");
}
