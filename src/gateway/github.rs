use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::models::{
    Content, GitCommit, GitRef, GitTree, Installation, InstallationRepositories,
    InstallationToken, Repository,
};
use crate::errors::{GatewayError, GatewayResult};

pub const USER_AGENT: &str = "flowgate";
const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// Thin REST client for the GitHub App endpoint family.
///
/// Every call takes the bearer credential explicitly: the App assertion for
/// `/app/...` endpoints, an installation token for everything else.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
}

impl GitHubClient {
    pub fn new(http: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// List installations of the App. Authenticated with the App assertion.
    pub async fn list_installations(&self, assertion: &str) -> GatewayResult<Vec<Installation>> {
        let url = self.url(["app", "installations"])?;
        self.send_json(self.request(Method::GET, url, assertion)).await
    }

    /// Exchange the App assertion for an installation-scoped token.
    pub async fn create_installation_token(
        &self,
        assertion: &str,
        installation_id: u64,
    ) -> GatewayResult<InstallationToken> {
        let id = installation_id.to_string();
        let url = self.url(["app", "installations", id.as_str(), "access_tokens"])?;
        self.send_json(self.request(Method::POST, url, assertion)).await
    }

    /// One page of the repositories the installation can see.
    pub async fn list_installation_repositories(
        &self,
        token: &str,
        page: u32,
        per_page: u32,
    ) -> GatewayResult<InstallationRepositories> {
        let url = self.url(["installation", "repositories"])?;
        let req = self
            .request(Method::GET, url, token)
            .query(&[("per_page", per_page), ("page", page)]);
        self.send_json(req).await
    }

    pub async fn get_repository(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
    ) -> GatewayResult<Repository> {
        let url = self.url(["repos", owner, repo])?;
        self.send_json(self.request(Method::GET, url, token)).await
    }

    /// Resolve `refs/heads/{branch}`. Branch names may contain `/`.
    pub async fn get_branch_ref(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> GatewayResult<GitRef> {
        let segments = ["repos", owner, repo, "git", "ref", "heads"]
            .into_iter()
            .chain(branch.split('/'));
        let url = self.url(segments)?;
        self.send_json(self.request(Method::GET, url, token)).await
    }

    pub async fn get_commit(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> GatewayResult<GitCommit> {
        let url = self.url(["repos", owner, repo, "git", "commits", sha])?;
        self.send_json(self.request(Method::GET, url, token)).await
    }

    /// Fetch a whole tree in one call. Large trees come back `truncated`.
    pub async fn get_tree_recursive(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        tree_sha: &str,
    ) -> GatewayResult<GitTree> {
        let url = self.url(["repos", owner, repo, "git", "trees", tree_sha])?;
        let req = self
            .request(Method::GET, url, token)
            .query(&[("recursive", "1")]);
        self.send_json(req).await
    }

    /// Fetch a file or directory listing at `path`.
    pub async fn get_contents(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> GatewayResult<Content> {
        let segments = ["repos", owner, repo, "contents"]
            .into_iter()
            .chain(path.split('/').filter(|s| !s.is_empty()));
        let url = self.url(segments)?;
        let mut req = self.request(Method::GET, url, token);
        if let Some(git_ref) = git_ref {
            req = req.query(&[("ref", git_ref)]);
        }
        let value: serde_json::Value = self.send_json(req).await?;
        Content::from_upstream(value).map_err(|e| GatewayError::Upstream {
            status: None,
            body: format!("Unexpected contents response: {}", e),
        })
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn url<'a, I>(&self, segments: I) -> GatewayResult<Url>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = Url::parse(&self.api_url).map_err(|e| GatewayError::ConfigInvalid {
            name: "GITHUB_API_URL",
            message: e.to_string(),
        })?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::ConfigInvalid {
                name: "GITHUB_API_URL",
                message: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, bearer: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", bearer))
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", USER_AGENT)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> GatewayResult<T> {
        let resp = req.send().await.map_err(|e| {
            warn!(error = %e, "GitHub request failed to complete");
            GatewayError::from(e)
        })?;
        let status = resp.status();
        let url = resp.url().path().to_string();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, path = %url, "GitHub API returned error status");
            return Err(GatewayError::upstream(status, body));
        }

        debug!(%status, path = %url, "GitHub API call succeeded");
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!(error = %e, path = %url, "GitHub API returned malformed body");
            GatewayError::Upstream {
                status: Some(status.as_u16()),
                body: format!("Malformed response body: {}", e),
            }
        })
    }
}
