//! GitHub OAuth web flow: authorize redirect, code exchange and `/user`.

use rand::Rng;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::github::USER_AGENT;
use super::session::SessionIdentity;
use crate::errors::{GatewayError, GatewayResult};

pub const OAUTH_SCOPE: &str = "read:user user:email";

/// Response from GitHub's access-token endpoint. Errors arrive with a 200
/// status and an `error` field.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
}

/// The subset of `GET /user` kept in the session.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl GitHubUser {
    pub fn into_identity(self) -> SessionIdentity {
        SessionIdentity {
            github_id: self.id,
            login: self.login,
            name: self.name,
            email: self.email,
            avatar_url: self.avatar_url,
        }
    }
}

/// 16 random bytes, hex encoded.
pub fn generate_state() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    hex::encode(bytes)
}

pub fn authorize_url(
    web_url: &str,
    client_id: &str,
    redirect_uri: &str,
    state: &str,
) -> GatewayResult<Url> {
    Url::parse_with_params(
        &format!("{}/login/oauth/authorize", web_url.trim_end_matches('/')),
        &[
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("scope", OAUTH_SCOPE),
            ("state", state),
        ],
    )
    .map_err(|e| GatewayError::ConfigInvalid {
        name: "GITHUB_WEB_URL",
        message: e.to_string(),
    })
}

/// Trade an authorization code for a user access token.
pub async fn exchange_code(
    http: &reqwest::Client,
    web_url: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
) -> GatewayResult<String> {
    let url = format!("{}/login/oauth/access_token", web_url.trim_end_matches('/'));
    let resp = http
        .post(&url)
        .header("Accept", "application/json")
        .header("User-Agent", USER_AGENT)
        .json(&TokenRequest {
            client_id,
            client_secret,
            code,
            redirect_uri,
        })
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        warn!(%status, "OAuth token exchange rejected");
        return Err(GatewayError::upstream(status, body));
    }

    let token: TokenResponse = resp.json().await?;
    if let Some(error) = token.error {
        let body = token.error_description.unwrap_or(error);
        warn!(%body, "OAuth token exchange returned an error");
        return Err(GatewayError::Upstream {
            status: Some(status.as_u16()),
            body,
        });
    }

    token.access_token.ok_or_else(|| GatewayError::Upstream {
        status: Some(status.as_u16()),
        body: "No access token in OAuth response".to_string(),
    })
}

/// Fetch the authenticated user's profile.
pub async fn fetch_user(
    http: &reqwest::Client,
    api_url: &str,
    access_token: &str,
) -> GatewayResult<GitHubUser> {
    let url = format!("{}/user", api_url.trim_end_matches('/'));
    let resp = http
        .get(&url)
        .header("Authorization", format!("Bearer {}", access_token))
        .header("Accept", "application/vnd.github+json")
        .header("User-Agent", USER_AGENT)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        warn!(%status, "GitHub /user failed");
        return Err(GatewayError::upstream(status, body));
    }
    Ok(resp.json().await?)
}
