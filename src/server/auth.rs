//! Bearer-secret check applied to every front-end route

use std::sync::Arc;
use axum::extract::{Request, State};
use axum::http::{header::AUTHORIZATION, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::warn;
use subtle::ConstantTimeEq;
use super::openai::ErrorBody;

/// Secret shared by the middleware; `None` rejects every request.
pub type Secret = Option<Arc<str>>;

/// Compare a presented token to the configured secret in constant time.
pub fn authorized(secret: Option<&str>, token: &str) -> bool
{   match secret
    {   Some(secret) => bool::from(secret.as_bytes().ct_eq(token.as_bytes()))
      , None => false
    }
}

pub async fn require_bearer(
  State(secret): State<Secret>
, request: Request
, next: Next
) -> Response
{   let header = request.headers()
      .get(AUTHORIZATION)
      .and_then(|value| value.to_str().ok())
      .unwrap_or("");
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();

    if authorized(secret.as_deref(), token)
    {   return next.run(request).await;
    }

    warn!("Rejected unauthorized request to {}", request.uri().path());
    (
      StatusCode::UNAUTHORIZED
    , Json(ErrorBody::new("Unauthorized", "unauthorized"))
    ).into_response()
}
