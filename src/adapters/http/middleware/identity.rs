//! Caller identity plumbing.
//!
//! Authentication itself (OAuth handshake, sessions) happens outside this
//! crate; by the time a request reaches these routes the auth layer has
//! established who the caller is. The middleware trusts the `x-user-id`
//! header that layer sets and injects a `CallerIdentity` into request
//! extensions; the `RequireUser` extractor reads it back out.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::UserId;

/// Header carrying the pre-verified caller id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller, injected into request extensions.
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity(pub UserId);

/// Reads the trusted identity header and injects `CallerIdentity`.
///
/// Requests without a parseable id continue without an identity; routes
/// using `RequireUser` then answer 401.
pub async fn identity_middleware(mut request: Request, next: Next) -> Response {
    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<UserId>().ok());

    if let Some(user_id) = user_id {
        request.extensions_mut().insert(CallerIdentity(user_id));
    }
    next.run(request).await
}

/// Extractor requiring an authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct RequireUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .map(|identity| RequireUser(identity.0))
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "Authentication required" })),
                )
                    .into_response()
            })
    }
}
