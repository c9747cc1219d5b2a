//! Principal resolution for API requests.

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use plubin_types::Role;
use std::sync::Arc;

use crate::AppState;

/// The resolved principal of a request, stored in request extensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Principal(pub Role);

/// Extracts the presented API key from `apikey` or `Authorization: Bearer`.
///
/// `Err(())` means a header was present but malformed.
fn presented_key(headers: &HeaderMap) -> Result<Option<String>, ()> {
    if let Some(val) = headers.get("apikey") {
        let key = val.to_str().map_err(|_| ())?;
        return Ok(Some(key.to_string()));
    }
    if let Some(val) = headers.get("Authorization") {
        let val_str = val.to_str().map_err(|_| ())?;
        return match val_str.strip_prefix("Bearer ") {
            Some(token) => Ok(Some(token.to_string())),
            None => Err(()),
        };
    }
    Ok(None)
}

/// Resolves the caller's [`Role`] and stores it as a [`Principal`].
///
/// Requests without a key proceed as anonymous. A malformed header or an
/// unknown key is rejected with `401 Unauthorized`.
pub async fn principal_middleware(
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let key = presented_key(req.headers()).map_err(|()| StatusCode::UNAUTHORIZED)?;

    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?
        .clone();

    let role = match state.auth.role_for_key(key.as_deref()) {
        Some(role) => role,
        None => {
            tracing::debug!(path = %req.uri().path(), "rejecting unknown api key");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    req.extensions_mut().insert(Principal(role));
    Ok(next.run(req).await)
}
