//! GitHub gateway: session cookies, App credentials and repository reads.
//!
//! ## Module Map
//!
//! ```text
//! ┌───────────┐  HTTP  ┌───────────────────────────────────────────────────┐
//! │ Dashboard │ ─────> │  server.rs  (Router, TraceLayer, ServerConfig)    │
//! │ (browser) │ <───── │    └─ api.rs  (handlers, AppState, ApiError)      │
//! └───────────┘ cookie │         │                                         │
//!                      │         │ AuthUser (extractor.rs)                 │
//!                      │         │   └─ SessionCodec::verify (session.rs)  │
//!                      │         │                                         │
//!                      │         │ CredentialExchange::installation_token  │
//!                      │         v                                         │
//!                      │  credentials.rs  (assertion, token cache)         │
//!                      │         │                                         │
//!                      │         v                                         │
//!                      │  github.rs  (GitHubClient) ──> api.github.com     │
//!                      │         ^                                         │
//!                      │  tree.rs  (ref → commit → tree → *.yml)           │
//!                      └───────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module     | Responsibility                                            |
//! |------------|-----------------------------------------------------------|
//! | `models`   | Wire types: `Repository`, `GitTree`, `Content`, tokens    |
//! | `oauth`    | Authorize URL, code exchange, `GET /user`                 |
//! | `cookies`  | `session`, `oauth_state`, `github_installation_id` cookies |
//!
//! ## Typical Request Flow (list repositories)
//!
//! 1. `GET /api/auth/github/repos?operation=list` → `AuthUser` verifies the
//!    `session` cookie or rejects with 401.
//! 2. The installation id comes from the `github_installation_id` cookie, or
//!    the App's first installation is discovered with a fresh assertion.
//! 3. `InstallationTokenCache::get_or_mint` returns a cached token or mints
//!    one via `POST /app/installations/{id}/access_tokens`.
//! 4. `GET /installation/repositories` is called with that token and the
//!    page flags are computed from `total_count`.

pub mod api;
pub mod cookies;
pub mod credentials;
pub mod extractor;
pub mod github;
pub mod models;
pub mod oauth;
pub mod server;
pub mod session;
pub mod tree;

#[cfg(test)]
pub mod test_support;
