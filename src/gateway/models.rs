//! Wire types for the GitHub REST endpoints and the gateway's own responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Installations ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationAccount {
    pub login: String,
}

/// A GitHub App installation (subset of fields).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installation {
    pub id: u64,
    #[serde(default)]
    pub account: Option<InstallationAccount>,
}

/// Response from `POST /app/installations/{id}/access_tokens`.
#[derive(Clone, Deserialize)]
pub struct InstallationToken {
    pub token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for InstallationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

// ── Repositories ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
}

/// A repository visible to an installation (subset of fields the dashboard shows).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: RepositoryOwner,
    pub private: bool,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub pushed_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Response from `GET /installation/repositories`.
#[derive(Debug, Deserialize)]
pub struct InstallationRepositories {
    pub total_count: u64,
    pub repositories: Vec<Repository>,
}

/// Pagination flags derived from a `total_count` snapshot.
///
/// Upstream link headers are not consulted, so the flags are only as stable
/// as `total_count` is between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PageInfo {
    pub fn compute(total_count: u64, page: u32, per_page: u32) -> Self {
        let per_page = per_page.max(1);
        let total_pages = total_count.div_ceil(u64::from(per_page));
        Self {
            page,
            per_page,
            total_pages,
            has_next_page: u64::from(page) < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// One page of installation repositories as returned to the dashboard.
#[derive(Debug, Serialize)]
pub struct RepositoryPage {
    pub repositories: Vec<Repository>,
    pub total_count: u64,
    #[serde(flatten)]
    pub page_info: PageInfo,
}

// ── Git data ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct GitObject {
    pub sha: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Response from `GET /repos/{o}/{r}/git/ref/{ref}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub name: String,
    pub object: GitObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreePointer {
    pub sha: String,
}

/// Response from `GET /repos/{o}/{r}/git/commits/{sha}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitCommit {
    pub sha: String,
    pub tree: TreePointer,
}

/// Object type of a tree entry: file, directory, or submodule link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeEntryKind {
    Blob,
    Tree,
    Commit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: TreeEntryKind,
    pub sha: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Response from `GET /repos/{o}/{r}/git/trees/{sha}?recursive=1`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitTree {
    pub sha: String,
    pub tree: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

/// Result of configuration-file discovery.
///
/// `truncated` is copied from the upstream tree: when true the file list
/// may be incomplete, not empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigFiles {
    pub owner: String,
    pub repo: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub commit_sha: String,
    pub files: Vec<String>,
    pub truncated: bool,
}

// ── Contents ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    File,
    Dir,
    Symlink,
    Submodule,
}

/// A file descriptor from the contents API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileContent {
    pub name: String,
    pub path: String,
    pub sha: String,
    pub size: u64,
    #[serde(default)]
    pub encoding: Option<String>,
    /// Base64 with embedded newlines, as GitHub sends it.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// One entry of a directory listing from the contents API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: ContentKind,
}

/// The contents API answers with an object for a file and an array for a
/// directory; this makes the two shapes explicit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    File(FileContent),
    Directory { entries: Vec<ContentEntry> },
}

impl Content {
    pub fn from_upstream(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        if value.is_array() {
            let entries = serde_json::from_value(value)?;
            Ok(Content::Directory { entries })
        } else {
            Ok(Content::File(serde_json::from_value(value)?))
        }
    }
}
