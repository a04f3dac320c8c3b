use std::time::Instant;

use axum::{
    extract::Request,
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Errors travel inside the body, so the summary records the body size
/// alongside the status.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started_at = Instant::now();

    if declares_no_body(&method, request.headers()) {
        warn!(method = %method, path = %path, "call without a request body");
    }

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started_at.elapsed().as_millis();
    let body_bytes = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string();

    info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        body_bytes = %body_bytes,
        duration_ms = elapsed_ms,
        "request summary"
    );

    response
}

/// Anything but a preflight is read up to `Content-Length`, so a missing or
/// zero length means the call will be answered with a parse error.
fn declares_no_body(method: &Method, headers: &HeaderMap) -> bool {
    if method == Method::OPTIONS {
        return false;
    }
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<usize>().ok())
        .map_or(true, |length| length == 0)
}
