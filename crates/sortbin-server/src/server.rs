use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use sortbin_link::{ConnectionRegistry, RequestRouter};
use sortbin_store::Database;

use crate::handlers;
use crate::ws;

/// Server configuration.
pub struct ServerConfig {
    pub port: u16,
    /// Outbound frames queued per device before writes fail.
    pub max_send_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            max_send_queue: 256,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub router: RequestRouter,
    pub db: Database,
    pub max_send_queue: usize,
}

impl AppState {
    pub fn new(db: Database, max_send_queue: usize) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let router = RequestRouter::new(Arc::clone(&registry));
        Self {
            registry,
            router,
            db,
            max_send_queue,
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/ws/dustbins/{dustbin_id}", get(ws::ws_handler))
        .route(
            "/api/v1/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route("/api/v1/users/{username}", get(handlers::get_user))
        .route(
            "/api/v1/dustbins",
            get(handlers::list_dustbins).post(handlers::create_dustbin),
        )
        .route("/api/v1/dustbins/{id}", get(handlers::get_dustbin))
        .route("/api/v1/dustbins/{id}/requests", post(handlers::open_lid))
        .route(
            "/api/v1/dustbins/{id}/requests/{request_id}",
            get(handlers::get_device_request),
        )
        .route(
            "/api/v1/wastes",
            get(handlers::list_wastes).post(handlers::create_waste),
        )
        .route(
            "/api/v1/wastes/actions/report-incorrect-categorization",
            post(handlers::report_incorrect_categorization),
        )
        .route("/api/v1/wastes/{id}", get(handlers::get_waste))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create and start the server. Returns a handle that keeps it alive.
pub async fn start(config: ServerConfig, db: Database) -> Result<ServerHandle, std::io::Error> {
    let state = AppState::new(db, config.max_send_queue);
    let registry = Arc::clone(&state.registry);
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "sortbin server started");

    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        registry,
        _server: server,
    })
}

/// Handle returned by `start()`.
pub struct ServerHandle {
    pub port: u16,
    /// The live device registry, exposed for observability.
    pub registry: Arc<ConnectionRegistry>,
    _server: tokio::task::JoinHandle<()>,
}
