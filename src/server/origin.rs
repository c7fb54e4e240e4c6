//! Same-origin guard for the loopback server.
//!
//! Outside dev mode the board has no credentials of its own, so any web
//! page the user visits could otherwise reach `127.0.0.1` and drive it.
//! Browsers always send `Origin` on cross-origin fetches and WebSocket
//! upgrades; requests without one (curl, the CLI) pass through.

use axum::{
    extract::Request,
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

use super::api::ApiError;

pub async fn same_origin_only(req: Request, next: Next) -> Result<Response, ApiError> {
    if !origin_allowed(req.headers()) {
        tracing::warn!(
            origin = ?req.headers().get(header::ORIGIN),
            path = %req.uri().path(),
            "rejected cross-origin request"
        );
        return Err(ApiError::Forbidden(
            "Cross-origin requests are not allowed".to_string(),
        ));
    }
    Ok(next.run(req).await)
}

/// True when there is no `Origin`, or it names the host being addressed.
fn origin_allowed(headers: &HeaderMap) -> bool {
    let Some(origin) = headers.get(header::ORIGIN) else {
        return true;
    };
    let host = headers.get(header::HOST).and_then(|h| h.to_str().ok());
    match (origin.to_str().ok(), host) {
        (Some(origin), Some(host)) => origin
            .strip_prefix("http://")
            .is_some_and(|authority| authority.eq_ignore_ascii_case(host)),
        _ => false,
    }
}
