use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use tracing::{error, info, warn};

use super::cookies;
use super::credentials::CredentialExchange;
use super::extractor::AuthUser;
use super::github::GitHubClient;
use super::models::{PageInfo, RepositoryPage};
use super::oauth;
use super::session::{SessionCodec, SessionIdentity};
use super::tree;
use crate::config::GatewayConfig;
use crate::errors::GatewayError;

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_PER_PAGE: u32 = 30;
const MAX_PER_PAGE: u32 = 100;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub config: GatewayConfig,
    pub codec: SessionCodec,
    pub http: reqwest::Client,
    pub exchange: CredentialExchange,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: GatewayConfig, http: reqwest::Client) -> Self {
        let github = GitHubClient::new(http.clone(), config.github.api_url.clone());
        let exchange = CredentialExchange::new(
            github,
            config.github.clone(),
            config.token_cache_enabled,
        );
        Self {
            codec: SessionCodec::new(&config.session_secret),
            config,
            http,
            exchange,
        }
    }

    fn frontend_root(&self) -> Redirect {
        Redirect::temporary(&format!("{}/", self.config.frontend_url))
    }

    fn login_error(&self, code: &str) -> Redirect {
        Redirect::temporary(&format!("{}/login?error={}", self.config.frontend_url, code))
    }
}

// ── Request payload types ─────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub action: Option<String>,
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InstallQuery {
    pub installation_id: Option<String>,
    pub setup_action: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReposQuery {
    pub operation: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub path: Option<String>,
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    /// Upstream GitHub failure; the detail is logged, not returned.
    Upstream,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Upstream => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch repositories".to_string(),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Validation(msg) => ApiError::BadRequest(msg),
            GatewayError::InvalidToken => ApiError::Unauthorized("Invalid session".to_string()),
            GatewayError::Upstream { status, body } => {
                error!(?status, %body, "GitHub upstream call failed");
                ApiError::Upstream
            }
            e @ (GatewayError::ConfigMissing { .. } | GatewayError::ConfigInvalid { .. }) => {
                error!(error = %e, "request needs configuration that is not usable");
                ApiError::Internal(e.to_string())
            }
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/auth/github", get(github_auth))
        .route("/api/auth/github/install", get(github_install))
        .route("/api/auth/github/repos", get(github_repos))
        .route("/api/auth/user", get(current_user))
        .route("/api/auth/logout", post(logout))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn github_auth(
    State(state): State<SharedState>,
    jar: CookieJar,
    Query(query): Query<AuthQuery>,
) -> Result<Response, ApiError> {
    match query.action.as_deref().unwrap_or("login") {
        "login" => begin_login(&state, jar),
        "callback" => Ok(finish_login(&state, jar, query).await),
        other => {
            warn!(action = %other, "unknown OAuth action");
            Ok(state.login_error("invalid_action").into_response())
        }
    }
}

fn begin_login(state: &AppState, jar: CookieJar) -> Result<Response, ApiError> {
    let gh = &state.config.github;
    let nonce = oauth::generate_state();
    let url = oauth::authorize_url(&gh.web_url, gh.client_id()?, gh.redirect_url()?, &nonce)?;
    let jar = jar.add(cookies::oauth_state_cookie(nonce, state.config.secure_cookies));
    Ok((jar, Redirect::temporary(url.as_str())).into_response())
}

async fn finish_login(state: &AppState, jar: CookieJar, query: AuthQuery) -> Response {
    let expected = cookies::oauth_state(&jar);
    let (Some(code), Some(returned)) = (query.code, query.state) else {
        warn!("OAuth callback without code or state");
        return state.login_error("state_mismatch").into_response();
    };
    if expected.as_deref() != Some(returned.as_str()) {
        warn!("OAuth state mismatch");
        return state.login_error("state_mismatch").into_response();
    }

    match complete_oauth(state, &code).await {
        Ok(identity) => {
            info!(login = %identity.login, "GitHub login completed");
            let token = state.codec.sign(&identity);
            let jar = jar
                .add(cookies::clear_oauth_state_cookie())
                .add(cookies::session_cookie(token, state.config.secure_cookies));
            (jar, state.frontend_root()).into_response()
        }
        Err(e) => {
            error!(error = %e, "GitHub OAuth callback failed");
            state.login_error("oauth_failed").into_response()
        }
    }
}

async fn complete_oauth(state: &AppState, code: &str) -> Result<SessionIdentity, GatewayError> {
    let gh = &state.config.github;
    let access_token = oauth::exchange_code(
        &state.http,
        &gh.web_url,
        gh.client_id()?,
        gh.client_secret()?,
        code,
        gh.redirect_url()?,
    )
    .await?;
    let user = oauth::fetch_user(&state.http, &gh.api_url, &access_token).await?;
    Ok(user.into_identity())
}

async fn github_install(
    State(state): State<SharedState>,
    jar: CookieJar,
    Query(query): Query<InstallQuery>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let installation_id = query
        .installation_id
        .as_deref()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .ok_or_else(|| ApiError::BadRequest("installation_id must be a numeric id".to_string()))?;

    info!(
        installation_id,
        setup_action = query.setup_action.as_deref().unwrap_or("install"),
        "recorded GitHub App installation"
    );
    let jar = jar.add(cookies::installation_cookie(
        installation_id,
        state.config.secure_cookies,
    ));
    Ok((jar, state.frontend_root()))
}

async fn current_user(AuthUser(payload): AuthUser) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "user": payload }))
}

async fn logout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    (
        jar.add(cookies::clear_session_cookie()),
        Json(serde_json::json!({ "message": "Logout successful" })),
    )
}

async fn github_repos(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    jar: CookieJar,
    Query(query): Query<ReposQuery>,
) -> Result<Response, ApiError> {
    let installation_id = cookies::installation_id(&jar);
    let github = state.exchange.github();

    match query.operation.as_deref().unwrap_or("list") {
        "list" => {
            let (page, per_page) = pagination(&query)?;
            let credential = state.exchange.installation_token(installation_id).await?;
            let listing = github
                .list_installation_repositories(credential.bearer(), page, per_page)
                .await
                .inspect_err(|e| state.exchange.note_failure(&credential, e))?;
            info!(login = %user.identity.login, total = listing.total_count, page, "listed repositories");
            Ok(Json(RepositoryPage {
                page_info: PageInfo::compute(listing.total_count, page, per_page),
                total_count: listing.total_count,
                repositories: listing.repositories,
            })
            .into_response())
        }
        "content" => {
            let (owner, repo) = require_repo(&query)?;
            let path = query.path.as_deref().unwrap_or("");
            let credential = state.exchange.installation_token(installation_id).await?;
            let content = github
                .get_contents(credential.bearer(), owner, repo, path, query.git_ref.as_deref())
                .await
                .inspect_err(|e| state.exchange.note_failure(&credential, e))?;
            Ok(Json(content).into_response())
        }
        "yaml-files" => {
            let (owner, repo) = require_repo(&query)?;
            let credential = state.exchange.installation_token(installation_id).await?;
            let found = tree::discover_config_files(
                github,
                credential.bearer(),
                owner,
                repo,
                query.git_ref.as_deref(),
            )
            .await
            .inspect_err(|e| state.exchange.note_failure(&credential, e))?;
            Ok(Json(found).into_response())
        }
        other => Err(ApiError::BadRequest(format!("Unknown operation: {}", other))),
    }
}

// ── Helpers ───────────────────────────────────────────────────────────

fn parse_number(name: &str, raw: Option<&str>, default: u32) -> Result<u32, GatewayError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(v) => v
            .parse::<u32>()
            .map_err(|_| GatewayError::Validation(format!("{} must be a positive integer", name))),
    }
}

/// `page` is at least 1; `per_page` is clamped to `1..=100`.
fn pagination(query: &ReposQuery) -> Result<(u32, u32), GatewayError> {
    let page = parse_number("page", query.page.as_deref(), DEFAULT_PAGE)?.max(1);
    let per_page =
        parse_number("per_page", query.per_page.as_deref(), DEFAULT_PER_PAGE)?.clamp(1, MAX_PER_PAGE);
    Ok((page, per_page))
}

fn require_repo(query: &ReposQuery) -> Result<(&str, &str), GatewayError> {
    let owner = query.owner.as_deref().filter(|v| !v.is_empty());
    let repo = query.repo.as_deref().filter(|v| !v.is_empty());
    match (owner, repo) {
        (Some(owner), Some(repo)) => Ok((owner, repo)),
        _ => Err(GatewayError::Validation(
            "owner and repo are required".to_string(),
        )),
    }
}
