//! Middleware that logs each request and response, including bodies.

use axum::{body::Body, extract::Request, middleware::Next, response::Response};

/// The maximum number of characters of a request or response body to log at
/// the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Log each request and the response it produced.
///
/// Both are logged at the `info` level. A body longer than
/// [LOG_BODY_LENGTH_LIMIT] characters is truncated, with the full body logged
/// at the `debug` level. Bodies are buffered in full; the server installs
/// this middleware in debug builds only.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_text = read_body_text(body).await;
    log_request(&parts, &body_text);

    let request = Request::from_parts(parts, body_text.into());
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_text = read_body_text(body).await;
    log_response(&parts, &body_text);

    Response::from_parts(parts, body_text.into())
}

async fn read_body_text(body: Body) -> String {
    let body_bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    String::from_utf8_lossy(&body_bytes).to_string()
}

fn log_request(parts: &axum::http::request::Parts, body: &str) {
    match body_preview(body) {
        Some(preview) => {
            tracing::info!("Received request: {parts:#?}\nbody: {preview}...");
            tracing::debug!("Full request body: {body:?}");
        }
        None => tracing::info!("Received request: {parts:#?}\nbody: {body:?}"),
    }
}

fn log_response(parts: &axum::http::response::Parts, body: &str) {
    match body_preview(body) {
        Some(preview) => {
            tracing::info!("Sending response: {parts:#?}\nbody: {preview}...");
            tracing::debug!("Full response body: {body:?}");
        }
        None => tracing::info!("Sending response: {parts:#?}\nbody: {body:?}"),
    }
}

/// The first [LOG_BODY_LENGTH_LIMIT] characters of a body that is too long
/// to log in full, or `None` if the body can be logged as is.
///
/// Truncation counts characters rather than bytes so that a multi-byte
/// character is never split.
fn body_preview(body: &str) -> Option<String> {
    if body.chars().count() > LOG_BODY_LENGTH_LIMIT {
        Some(body.chars().take(LOG_BODY_LENGTH_LIMIT).collect())
    } else {
        None
    }
}
