use axum::{
    extract::Request,
    http::{self, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::info;
use uuid::Uuid;

use crate::key_generator::request_client_identifier;

/// Logging middleware for request/response tracking
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let client = request_client_identifier(&request);
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string();

    info!(
        target: "map_ascii_api::middleware",
        method = %method,
        uri = %uri,
        client = %client,
        request_id = %request_id,
        "Incoming request"
    );

    let start = Instant::now();
    let response = next.run(request).await;

    info!(
        target: "map_ascii_api::middleware",
        method = %method,
        uri = %uri,
        status = %response.status(),
        request_id = %request_id,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );

    response
}

/// Assigns a random UUID v4 to requests that arrive without an `x-request-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}
