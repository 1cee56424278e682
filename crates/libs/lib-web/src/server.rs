//! # Server Setup
//!
//! Startup sequence, shared state and router construction.
//!
//! Startup:
//! 1. Load `.env` and validate [`Config`]
//! 2. Initialize tracing (`LOG_LEVEL`, `LOG_FORMAT`)
//! 3. Open the SQLite pool, run migrations, seed the default user
//! 4. Build [`AppState`] and the router
//! 5. Serve until Ctrl-C/SIGTERM, then close live chat sessions with 1001

use crate::chat::{ChatAppState, ChatSettings, ResponseGenerator, SimpleChatbot};
use crate::handlers::{messages, threads, users, websocket};
use crate::middleware::{log_requests, map_res, stamp_req, RequestStamp};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::{routing::get, routing::post, Json, Router};
use lib_core::config::init_config;
use lib_core::model::store::{run_migrations, SqliteMessageStore, UserRepository};
use lib_core::{create_pool, Config, DbPool};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// region: --- App State

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub chat: Arc<ChatAppState>,
}

impl AppState {
    /// Wire the SQLite-backed message store and the given generator.
    pub fn new(db: DbPool, config: Config, generator: Arc<dyn ResponseGenerator>) -> Self {
        let store = Arc::new(SqliteMessageStore::new(db.clone()));
        let chat = Arc::new(ChatAppState::new(store, generator, ChatSettings::from(&config)));
        Self { db, config, chat }
    }

    /// Token that ends every live chat session when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.chat.shutdown.clone()
    }
}

impl axum::extract::FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl axum::extract::FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl axum::extract::FromRef<AppState> for Arc<ChatAppState> {
    fn from_ref(state: &AppState) -> Self {
        state.chat.clone()
    }
}

// endregion: --- App State

// region: --- Server Setup

/// Startup overrides on top of the environment configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Replaces `BIND_ADDRESS` when set
    pub bind_address: Option<String>,
}

pub async fn start_server(server_config: ServerConfig) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = init_config().map_err(|e| anyhow::anyhow!(e))?.clone();
    init_tracing(&config.log_level, &config.log_format)?;

    info!(" THREADCHAT BACKEND STARTING");
    info!(" Log level: {} ({})", config.log_level, config.log_format);
    info!("Database URL: {}", config.database_url);

    ensure_database_dir(&config.database_url)?;

    info!("Connecting to database...");
    let pool = create_pool(&config).await?;

    info!(" Running database migrations");
    run_migrations(&pool).await?;
    info!(" Migrations complete");

    if let Some(name) = &config.seed_user_name {
        if let Some(user) = UserRepository::seed_if_empty(&pool, name).await? {
            info!(user_id = user.id, name = %user.name, "Seeded default user");
        }
    }

    let bind_address = server_config
        .bind_address
        .unwrap_or_else(|| config.bind_address.clone());

    let state = AppState::new(pool.clone(), config, Arc::new(SimpleChatbot::new()));
    let shutdown = state.shutdown_token();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(" SERVER READY: http://{}", listener.local_addr()?);
    log_server_info();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    pool.close().await;
    info!("Server stopped");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG`, when set, overrides `level`.
pub fn init_tracing(level: &str, format: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let result = match format {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_target(true)
            .try_init(),
        _ => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_file(true)
            .try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to set global tracing subscriber: {}", e))
}

/// Create the parent directory of a file-backed SQLite URL.
fn ensure_database_dir(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
    else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }

    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            info!("Created database directory: {:?}", parent);
        }
    }
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM and cancel live chat sessions.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, closing chat sessions");
    shutdown.cancel();
}

pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static(crate::middleware::REQUEST_ID_HEADER),
        ])
        .allow_credentials(true);

    info!("[ROUTE SETUP] Registering HTTP routes...");
    let api = Router::new()
        .route("/users/", post(users::create_user))
        .route("/users/{user_id}", get(users::get_user))
        .route("/users/{user_id}/threads/", get(threads::list_user_threads))
        .route("/threads/", post(threads::create_thread))
        .route("/threads/{thread_id}", get(threads::get_thread))
        .route(
            "/threads/{thread_id}/messages/",
            post(messages::create_message).get(messages::list_messages),
        );

    Router::new()
        .route("/", get(root))
        .route("/health", get(|| async { "OK" }))
        .route("/ws/threads/{thread_id}", get(websocket::thread_websocket))
        .nest("/api/v1", api)
        .fallback(|| async {
            info!("[404 HANDLER] Unmatched route - returning 404");
            (axum::http::StatusCode::NOT_FOUND, "Route not found")
        })
        .with_state(state)
        .layer(axum::middleware::from_fn(map_res))
        // Tower HTTP trace layer for spans
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .extensions()
                        .get::<RequestStamp>()
                        .map(|s| s.id.clone())
                        .unwrap_or_else(|| "unknown".to_string());
                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                })
                .on_failure(
                    |error: tower_http::classify::ServerErrorsFailureClass,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::error!(
                            error = ?error,
                            latency_ms = latency.as_millis(),
                            "[HTTP FAILURE] Error: {:?}, Latency: {}ms",
                            error,
                            latency.as_millis()
                        );
                    },
                ),
        )
        .layer(axum::middleware::from_fn(log_requests))
        // Outermost so every other layer sees the request ID
        .layer(axum::middleware::from_fn(stamp_req))
        .layer(cors)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Chatbot API" }))
}

fn log_server_info() {
    info!(" USERS:");
    info!("   • POST /api/v1/users/");
    info!("   • GET  /api/v1/users/{{user_id}}");
    info!("   • GET  /api/v1/users/{{user_id}}/threads/");
    info!(" THREADS:");
    info!("   • POST /api/v1/threads/");
    info!("   • GET  /api/v1/threads/{{thread_id}}");
    info!(" MESSAGES:");
    info!("   • POST /api/v1/threads/{{thread_id}}/messages/");
    info!("   • GET  /api/v1/threads/{{thread_id}}/messages/");
    info!(" LIVE:");
    info!("   • WS   /ws/threads/{{thread_id}}");
    info!(" HEALTH:");
    info!("   • GET  /health");
}

// endregion: --- Server Setup
