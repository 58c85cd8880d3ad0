use crate::config::Config;
use crate::handlers::{generate_map, health_check, method_not_allowed, AppState, SharedState};
use crate::middleware::{logging_middleware, UuidRequestId};
use crate::render::Renderer;
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the router around existing state.
pub fn create_app(state: SharedState) -> Router {
    let write_timeout = state.write_timeout;

    Router::new()
        .route(
            "/api/generate",
            post(generate_map).fallback(method_not_allowed),
        )
        .route(
            "/api/healthz",
            get(health_check)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::new(write_timeout))
                .layer(middleware::from_fn(logging_middleware)),
        )
}

pub struct Server {
    app: Router,
    bind_addresses: Vec<String>,
}

impl Server {
    pub fn new(config: &Config, renderer: Arc<dyn Renderer>) -> Self {
        let state: SharedState = Arc::new(AppState::new(config, renderer));

        Self {
            app: create_app(state),
            bind_addresses: config.bind_addresses(),
        }
    }

    pub async fn run(self) -> std::io::Result<()> {
        let listener = bind(&self.bind_addresses).await?;

        tracing::info!("api listening on {}", listener.local_addr()?);

        // Run server with graceful shutdown
        axum::serve(
            listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
    }
}

/// Bind the first address that accepts a listener.
async fn bind(addresses: &[String]) -> std::io::Result<tokio::net::TcpListener> {
    let mut last_error = None;

    for address in addresses {
        match tokio::net::TcpListener::bind(address).await {
            Ok(listener) => return Ok(listener),
            Err(err) => {
                tracing::warn!(address = %address, error = %err, "bind failed");
                last_error = Some(err);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "no listen address configured")
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
