//! # Response Mapping Middleware
//!
//! Axum's own rejections (bad JSON, unparsable path segments, unknown routes)
//! come back as plain text. This middleware rewrites them into the same
//! `{"error": ..., "code": ...}` body that [`AppError`](lib_core::AppError) produces,
//! so clients only ever see one error shape.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use serde_json::json;
use tracing::{debug, error};

/// Rejection bodies are short; anything larger is left untouched.
const MAX_REJECTION_BODY: usize = 16 * 1024;

pub async fn map_res(req: Request, next: Next) -> Response {
    let res = next.run(req).await;
    let status = res.status();

    if status.is_server_error() {
        error!("[RESPONSE] Server error: {}", status);
    }

    if !(status.is_client_error() || status.is_server_error()) || is_json(&res) {
        return res;
    }

    let (mut parts, body) = res.into_parts();
    let text = match to_bytes(body, MAX_REJECTION_BODY).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
        Err(e) => {
            debug!(error = %e, "Rejection body unreadable");
            String::new()
        }
    };
    let message = if text.is_empty() {
        status.canonical_reason().unwrap_or("Request failed").to_string()
    } else {
        text
    };

    let body = json!({ "error": message, "code": rejection_code(status) }).to_string();
    parts.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(body))
}

fn is_json(res: &Response) -> bool {
    res.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

fn rejection_code(status: StatusCode) -> &'static str {
    match status {
        StatusCode::NOT_FOUND => "NotFound",
        StatusCode::METHOD_NOT_ALLOWED => "MethodNotAllowed",
        s if s.is_client_error() => "InvalidInput",
        _ => "Internal",
    }
}
