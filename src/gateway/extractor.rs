use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use tracing::debug;

use super::api::{ApiError, SharedState};
use super::cookies;
use super::session::SessionPayload;
use crate::errors::GatewayError;

/// Caller identity taken from a verified `session` cookie.
///
/// Rejects with `401 {"error": "Not authenticated"}` when the cookie is
/// absent and `401 {"error": "Invalid session"}` when it fails verification.
#[derive(Debug, Clone)]
pub struct AuthUser(pub SessionPayload);

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        let token = cookies::session_token(&jar)
            .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

        match state.codec.verify(&token) {
            Some(payload) => Ok(AuthUser(payload)),
            None => {
                debug!("rejected session cookie");
                Err(GatewayError::InvalidToken.into())
            }
        }
    }
}
