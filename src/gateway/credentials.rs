//! GitHub App credential exchange.
//!
//! A request moves through three states:
//!
//! 1. [`AppCredentials`] signs a short-lived RS256 [`Assertion`]
//!    (`iat = now - 60`, `exp = now + 600`, `iss = app id`).
//! 2. The assertion is exchanged upstream for an installation-scoped
//!    [`InstallationCredential`]. The installation id comes from the caller
//!    or, failing that, from the first installation the App can see.
//! 3. The credential authorises the REST calls for the current request.
//!
//! Any failure surfaces as a single `GatewayError` with no retry.
//!
//! [`InstallationTokenCache`] sits in front of step 2: tokens are kept per
//! installation until shortly before they expire, and concurrent requests
//! for the same installation wait on one in-flight exchange.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::github::GitHubClient;
use crate::config::GitHubSettings;
use crate::errors::{GatewayError, GatewayResult};

/// Clock-skew allowance subtracted from the assertion's `iat`.
const ASSERTION_BACKDATE_SECS: i64 = 60;
/// GitHub rejects assertions that live longer than ten minutes.
const ASSERTION_TTL_SECS: i64 = 600;
/// Cached tokens are replaced this long before upstream expiry.
const REFRESH_MARGIN_SECS: i64 = 300;
/// Used when the upstream response omits `expires_at`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Claims of the App assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// A signed App assertion, presented as a bearer credential to `/app/...`.
pub struct Assertion(String);

impl Assertion {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Assertion(<redacted>)")
    }
}

/// App id plus parsed private key.
pub struct AppCredentials {
    app_id: String,
    key: EncodingKey,
}

impl AppCredentials {
    pub fn new(app_id: impl Into<String>, private_key_pem: &str) -> GatewayResult<Self> {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).map_err(|e| {
            GatewayError::ConfigInvalid {
                name: "GITHUB_APP_PRIVATE_KEY",
                message: e.to_string(),
            }
        })?;
        Ok(Self {
            app_id: app_id.into(),
            key,
        })
    }

    pub fn from_settings(settings: &GitHubSettings) -> GatewayResult<Self> {
        let app_id = settings.app_id()?;
        let pem = settings.private_key_pem()?;
        Self::new(app_id, &pem)
    }

    pub fn claims_at(&self, now: i64) -> AssertionClaims {
        AssertionClaims {
            iat: now - ASSERTION_BACKDATE_SECS,
            exp: now + ASSERTION_TTL_SECS,
            iss: self.app_id.clone(),
        }
    }

    pub fn mint_assertion(&self) -> GatewayResult<Assertion> {
        self.mint_assertion_at(Utc::now().timestamp())
    }

    pub fn mint_assertion_at(&self, now: i64) -> GatewayResult<Assertion> {
        let claims = self.claims_at(now);
        let jwt = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| GatewayError::ConfigInvalid {
                name: "GITHUB_APP_PRIVATE_KEY",
                message: e.to_string(),
            })?;
        Ok(Assertion(jwt))
    }
}

/// An installation-scoped bearer token.
#[derive(Clone)]
pub struct InstallationCredential {
    pub installation_id: u64,
    token: String,
    pub expires_at: DateTime<Utc>,
}

impl InstallationCredential {
    pub fn new(installation_id: u64, token: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            installation_id,
            token,
            expires_at,
        }
    }

    pub fn bearer(&self) -> &str {
        &self.token
    }

    /// Usable for at least the refresh margin from `now`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

impl std::fmt::Debug for InstallationCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationCredential")
            .field("installation_id", &self.installation_id)
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

type Slot = Arc<tokio::sync::Mutex<Option<InstallationCredential>>>;

/// Per-installation get-or-mint cache.
///
/// Only installations that minted successfully keep a slot; a failed mint
/// releases its slot once no other caller is waiting on it.
#[derive(Default)]
pub struct InstallationTokenCache {
    slots: Mutex<HashMap<u64, Slot>>,
    discovered: Mutex<Option<u64>>,
}

impl InstallationTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, installation_id: u64) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(slots.entry(installation_id).or_default())
    }

    /// Drop `slot` from the map unless another caller still holds it.
    fn release(&self, installation_id: u64, slot: &Slot) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let idle = slots
            .get(&installation_id)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && Arc::strong_count(slot) == 2);
        if idle {
            slots.remove(&installation_id);
        }
    }

    /// Return a fresh cached credential or run `mint` to replace it.
    /// Callers for the same installation are serialised on its slot.
    pub async fn get_or_mint<F, Fut>(
        &self,
        installation_id: u64,
        mint: F,
    ) -> GatewayResult<InstallationCredential>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GatewayResult<InstallationCredential>>,
    {
        let slot = self.slot(installation_id);
        let minted = {
            let mut cached = slot.lock().await;

            if let Some(credential) = cached.as_ref() {
                if credential.is_fresh_at(Utc::now()) {
                    debug!(installation_id, "installation token cache hit");
                    return Ok(credential.clone());
                }
            }

            *cached = None;
            let minted = mint().await;
            if let Ok(credential) = &minted {
                *cached = Some(credential.clone());
            }
            minted
        };

        if minted.is_err() {
            self.release(installation_id, &slot);
        }
        minted
    }

    pub fn invalidate(&self, installation_id: u64) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.remove(&installation_id);
    }

    /// Installation id found by the last successful discovery.
    fn discovered(&self) -> Option<u64> {
        *self.discovered.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_discovered(&self, installation_id: Option<u64>) {
        *self.discovered.lock().unwrap_or_else(|e| e.into_inner()) = installation_id;
    }
}

/// Drives the assertion → installation token exchange for one request.
#[derive(Clone)]
pub struct CredentialExchange {
    github: GitHubClient,
    settings: GitHubSettings,
    cache: Option<Arc<InstallationTokenCache>>,
}

impl CredentialExchange {
    pub fn new(github: GitHubClient, settings: GitHubSettings, cache_enabled: bool) -> Self {
        Self {
            github,
            settings,
            cache: cache_enabled.then(|| Arc::new(InstallationTokenCache::new())),
        }
    }

    pub fn github(&self) -> &GitHubClient {
        &self.github
    }

    /// Obtain a credential for `installation_id`, or for the App's first
    /// installation when none is given. With the cache on, both the minted
    /// token and the discovered installation id are reused.
    pub async fn installation_token(
        &self,
        installation_id: Option<u64>,
    ) -> GatewayResult<InstallationCredential> {
        let Some(cache) = &self.cache else {
            let installation_id = match installation_id {
                Some(id) => id,
                None => self.discover_installation().await?,
            };
            return self.exchange(installation_id).await;
        };

        let (installation_id, discovered) = match installation_id {
            Some(id) => (id, false),
            None => match cache.discovered() {
                Some(id) => (id, true),
                None => {
                    let id = self.discover_installation().await?;
                    cache.set_discovered(Some(id));
                    (id, true)
                }
            },
        };

        let minted = cache
            .get_or_mint(installation_id, || self.exchange(installation_id))
            .await;
        if minted.is_err() && discovered {
            cache.set_discovered(None);
        }
        minted
    }

    /// Drop a cached credential that upstream refused as unauthorised.
    pub fn note_failure(&self, credential: &InstallationCredential, err: &GatewayError) {
        if let (Some(cache), GatewayError::Upstream { status: Some(401), .. }) = (&self.cache, err) {
            warn!(
                installation_id = credential.installation_id,
                "installation token rejected upstream, evicting it"
            );
            cache.invalidate(credential.installation_id);
        }
    }

    async fn discover_installation(&self) -> GatewayResult<u64> {
        let assertion = AppCredentials::from_settings(&self.settings)?.mint_assertion()?;
        let installations = self.github.list_installations(assertion.as_str()).await?;
        let first = installations.first().ok_or_else(|| GatewayError::Upstream {
            status: None,
            body: "No installations found for this app".to_string(),
        })?;
        debug!(installation_id = first.id, "discovered installation");
        Ok(first.id)
    }

    async fn exchange(&self, installation_id: u64) -> GatewayResult<InstallationCredential> {
        let assertion = AppCredentials::from_settings(&self.settings)?.mint_assertion()?;
        let token = self
            .github
            .create_installation_token(assertion.as_str(), installation_id)
            .await?;
        let expires_at = token
            .expires_at
            .unwrap_or_else(|| Utc::now() + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));
        info!(installation_id, %expires_at, "minted installation token");
        Ok(InstallationCredential::new(
            installation_id,
            token.token,
            expires_at,
        ))
    }
}
