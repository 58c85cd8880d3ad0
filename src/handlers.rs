use axum::{
    extract::{Request, State},
    Json,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::generator::MapGenerator;
use crate::key_generator::request_client_identifier;
use crate::rate_limiter::FixedWindowLimiter;
use crate::render::Renderer;
use crate::response::{GenerateResponse, HealthResponse};
use crate::validation::RequestValidator;

/// Shared application state
pub type SharedState = Arc<AppState>;

/// Application state containing rate limiter, validator and generator
pub struct AppState {
    pub rate_limiter: FixedWindowLimiter,
    pub validator: RequestValidator,
    pub generator: MapGenerator,
    pub max_body_bytes: usize,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl AppState {
    pub fn new(config: &Config, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            rate_limiter: FixedWindowLimiter::new(config.rate_limit, config.rate_window),
            validator: RequestValidator::new(config.limits),
            generator: MapGenerator::new(renderer),
            max_body_bytes: config.max_body_bytes,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
        }
    }
}

/// Generate a map: rate limit, decode, validate, render.
pub async fn generate_map(
    State(state): State<SharedState>,
    request: Request,
) -> Result<Json<GenerateResponse>> {
    let client = request_client_identifier(&request);
    if !state.rate_limiter.allow(&client, Instant::now()) {
        tracing::warn!(client = %client, "rate limit exceeded");
        return Err(ApiError::RateLimited);
    }

    let body = tokio::time::timeout(
        state.read_timeout,
        axum::body::to_bytes(request.into_body(), state.max_body_bytes),
    )
    .await
    .map_err(|_| {
        tracing::warn!(client = %client, "request body not received in time");
        ApiError::RequestTimeout
    })?
    .map_err(|err| ApiError::MalformedPayload(err.to_string()))?;

    let config = state.validator.validate_body(&body)?;

    let generator = state.generator.clone();
    let result = tokio::task::spawn_blocking(move || generator.generate(&config))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))??;

    Ok(Json(result.into()))
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Fallback for unsupported methods on known routes
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
