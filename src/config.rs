//! Environment-derived configuration.
//!
//! All settings come from the process environment (after `dotenvy` has
//! loaded an optional `.env`). Only the session secret is required to start
//! the server; GitHub App and OAuth settings are checked when a request
//! needs them, so a half-configured deployment still serves sessions.

use std::time::Duration;

use crate::errors::{GatewayError, GatewayResult};

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_WEB_URL: &str = "https://github.com";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Variables that are only needed once a request touches GitHub.
pub const REQUEST_TIME_VARS: &[&str] = &[
    "GITHUB_APP_ID",
    "GITHUB_APP_PRIVATE_KEY",
    "GITHUB_CLIENT_ID",
    "GITHUB_CLIENT_SECRET",
    "GITHUB_REDIRECT_URL",
];

/// GitHub endpoints and credentials.
#[derive(Clone, Default)]
pub struct GitHubSettings {
    pub api_url: String,
    pub web_url: String,
    pub app_id: Option<String>,
    pub private_key: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_url: Option<String>,
}

impl GitHubSettings {
    pub fn app_id(&self) -> GatewayResult<&str> {
        require("GITHUB_APP_ID", self.app_id.as_deref())
    }

    /// The App private key with literal `\n` sequences turned into newlines.
    pub fn private_key_pem(&self) -> GatewayResult<String> {
        let raw = require("GITHUB_APP_PRIVATE_KEY", self.private_key.as_deref())?;
        Ok(unescape_pem(raw))
    }

    pub fn client_id(&self) -> GatewayResult<&str> {
        require("GITHUB_CLIENT_ID", self.client_id.as_deref())
    }

    pub fn client_secret(&self) -> GatewayResult<&str> {
        require("GITHUB_CLIENT_SECRET", self.client_secret.as_deref())
    }

    pub fn redirect_url(&self) -> GatewayResult<&str> {
        require("GITHUB_REDIRECT_URL", self.redirect_url.as_deref())
    }
}

/// Runtime configuration for the gateway.
#[derive(Clone)]
pub struct GatewayConfig {
    pub session_secret: String,
    pub github: GitHubSettings,
    pub frontend_url: String,
    /// Sets the `Secure` attribute on every cookie (production only).
    pub secure_cookies: bool,
    pub token_cache_enabled: bool,
    pub upstream_timeout: Duration,
}

impl GatewayConfig {
    /// Load from the process environment.
    pub fn from_env() -> GatewayResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> GatewayResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let session_secret = get("SESSION_SECRET")
            .or_else(|| get("JWT_SECRET"))
            .ok_or(GatewayError::ConfigMissing {
                name: "SESSION_SECRET",
            })?;

        let upstream_timeout = match get("UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| GatewayError::ConfigInvalid {
                    name: "UPSTREAM_TIMEOUT_SECS",
                    message: e.to_string(),
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        };

        let token_cache_enabled = match get("INSTALLATION_TOKEN_CACHE") {
            Some(raw) => parse_bool("INSTALLATION_TOKEN_CACHE", &raw)?,
            None => true,
        };

        let secure_cookies = get("APP_ENV")
            .map(|env| env.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        Ok(Self {
            session_secret,
            github: GitHubSettings {
                api_url: trim_base(get("GITHUB_API_URL"), DEFAULT_GITHUB_API_URL),
                web_url: trim_base(get("GITHUB_WEB_URL"), DEFAULT_GITHUB_WEB_URL),
                app_id: get("GITHUB_APP_ID"),
                private_key: get("GITHUB_APP_PRIVATE_KEY"),
                client_id: get("GITHUB_CLIENT_ID"),
                client_secret: get("GITHUB_CLIENT_SECRET"),
                redirect_url: get("GITHUB_REDIRECT_URL"),
            },
            frontend_url: trim_base(get("FRONTEND_URL"), DEFAULT_FRONTEND_URL),
            secure_cookies,
            token_cache_enabled,
            upstream_timeout,
        })
    }

    /// Names of request-time variables that are not set.
    pub fn missing_request_time_vars(&self) -> Vec<&'static str> {
        let gh = &self.github;
        let present = [
            gh.app_id.is_some(),
            gh.private_key.is_some(),
            gh.client_id.is_some(),
            gh.client_secret.is_some(),
            gh.redirect_url.is_some(),
        ];
        REQUEST_TIME_VARS
            .iter()
            .zip(present)
            .filter(|(_, set)| !set)
            .map(|(name, _)| *name)
            .collect()
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let gh = &self.github;
        f.debug_struct("GatewayConfig")
            .field("session_secret", &"<redacted>")
            .field("github_api_url", &gh.api_url)
            .field("github_web_url", &gh.web_url)
            .field("github_app_id", &gh.app_id)
            .field("github_private_key", &gh.private_key.as_ref().map(|_| "<redacted>"))
            .field("github_client_id", &gh.client_id)
            .field("github_client_secret", &gh.client_secret.as_ref().map(|_| "<redacted>"))
            .field("github_redirect_url", &gh.redirect_url)
            .field("frontend_url", &self.frontend_url)
            .field("secure_cookies", &self.secure_cookies)
            .field("token_cache_enabled", &self.token_cache_enabled)
            .field("upstream_timeout", &self.upstream_timeout)
            .finish()
    }
}

/// Every unset variable that startup or a GitHub-backed request needs.
/// Unlike [`GatewayConfig::from_lookup`] this never fails early.
pub fn missing_vars<F>(lookup: F) -> Vec<&'static str>
where
    F: Fn(&str) -> Option<String>,
{
    let set = |name: &str| lookup(name).is_some_and(|v| !v.trim().is_empty());
    let mut missing = Vec::new();
    if !set("SESSION_SECRET") && !set("JWT_SECRET") {
        missing.push("SESSION_SECRET");
    }
    missing.extend(REQUEST_TIME_VARS.iter().copied().filter(|name| !set(name)));
    missing
}

fn require<'a>(name: &'static str, value: Option<&'a str>) -> GatewayResult<&'a str> {
    value.ok_or(GatewayError::ConfigMissing { name })
}

fn trim_base(value: Option<String>, default: &str) -> String {
    value
        .unwrap_or_else(|| default.to_string())
        .trim()
        .trim_end_matches('/')
        .to_string()
}

fn parse_bool(name: &'static str, raw: &str) -> GatewayResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(GatewayError::ConfigInvalid {
            name,
            message: format!("expected a boolean, got '{}'", other),
        }),
    }
}

/// PEM keys pasted into a single-line env var carry `\n` as two characters.
pub fn unescape_pem(raw: &str) -> String {
    raw.replace("\\n", "\n")
}
