//! Configuration-file discovery over a repository tree.
//!
//! Resolves a ref to its tip commit, the commit to its root tree, lists the
//! tree recursively in one call and keeps the `.yml` / `.yaml` files.

use tracing::{debug, warn};

use super::github::GitHubClient;
use super::models::{ConfigFiles, GitTree, TreeEntryKind};
use crate::errors::{GatewayError, GatewayResult};

const CONFIG_EXTENSIONS: &[&str] = &[".yml", ".yaml"];

pub fn is_config_file(path: &str) -> bool {
    CONFIG_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Paths of file entries with a YAML extension, in tree order.
pub fn config_file_paths(tree: &GitTree) -> Vec<String> {
    tree.tree
        .iter()
        .filter(|entry| entry.kind == TreeEntryKind::Blob && is_config_file(&entry.path))
        .map(|entry| entry.path.clone())
        .collect()
}

/// Find configuration files at `git_ref`, or at the default branch when no
/// ref is given.
pub async fn discover_config_files(
    github: &GitHubClient,
    token: &str,
    owner: &str,
    repo: &str,
    git_ref: Option<&str>,
) -> GatewayResult<ConfigFiles> {
    let git_ref = match git_ref {
        Some(r) => r.to_string(),
        None => github
            .get_repository(token, owner, repo)
            .await?
            .default_branch
            .ok_or_else(|| GatewayError::Upstream {
                status: None,
                body: format!("Repository {}/{} has no default branch", owner, repo),
            })?,
    };

    let commit_sha = resolve_commit_sha(github, token, owner, repo, &git_ref).await?;
    let commit = github.get_commit(token, owner, repo, &commit_sha).await?;
    let tree = github
        .get_tree_recursive(token, owner, repo, &commit.tree.sha)
        .await?;

    if tree.truncated {
        warn!(%owner, %repo, %git_ref, "recursive tree listing was truncated upstream");
    }

    let files = config_file_paths(&tree);
    debug!(%owner, %repo, %git_ref, count = files.len(), "discovered configuration files");

    Ok(ConfigFiles {
        owner: owner.to_string(),
        repo: repo.to_string(),
        git_ref,
        commit_sha: commit.sha,
        files,
        truncated: tree.truncated,
    })
}

/// Branch tip for `git_ref`; a ref that is not a branch is taken as a sha.
async fn resolve_commit_sha(
    github: &GitHubClient,
    token: &str,
    owner: &str,
    repo: &str,
    git_ref: &str,
) -> GatewayResult<String> {
    match github.get_branch_ref(token, owner, repo, git_ref).await {
        Ok(found) => Ok(found.object.sha),
        Err(GatewayError::Upstream {
            status: Some(404), ..
        }) => {
            debug!(%git_ref, "ref is not a branch, treating it as a commit sha");
            Ok(git_ref.to_string())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::models::TreeEntry;
    use crate::gateway::test_support::FakeGitHub;
    use axum::Json;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;

    fn entry(path: &str, kind: TreeEntryKind) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            kind,
            sha: "0".repeat(40),
            size: None,
        }
    }

    fn tree(entries: Vec<TreeEntry>, truncated: bool) -> GitTree {
        GitTree {
            sha: "t".to_string(),
            tree: entries,
            truncated,
        }
    }

    #[test]
    fn recognises_yaml_extensions() {
        assert!(is_config_file("a.yml"));
        assert!(is_config_file("dir/b.yaml"));
        assert!(!is_config_file("README.md"));
        assert!(!is_config_file("yml"));
        assert!(!is_config_file("config.yml.bak"));
    }

    #[test]
    fn filters_yaml_files_in_tree_order() {
        let t = tree(
            vec![
                entry(".github/workflows/ci.yml", TreeEntryKind::Blob),
                entry("README.md", TreeEntryKind::Blob),
                entry("notes.yaml", TreeEntryKind::Blob),
            ],
            false,
        );
        assert_eq!(
            config_file_paths(&t),
            vec![".github/workflows/ci.yml".to_string(), "notes.yaml".to_string()]
        );
    }

    #[test]
    fn directories_and_submodules_are_ignored() {
        let t = tree(
            vec![
                entry("charts.yaml", TreeEntryKind::Tree),
                entry("vendor/deps.yml", TreeEntryKind::Commit),
                entry("real.yml", TreeEntryKind::Blob),
            ],
            false,
        );
        assert_eq!(config_file_paths(&t), vec!["real.yml".to_string()]);
    }

    /// Fake repo `o/r` with default branch `main` → commit `c1` → tree `t1`.
    fn repo_router(tree_json: serde_json::Value) -> axum::Router {
        axum::Router::new()
            .route(
                "/repos/o/r",
                get(|| async {
                    Json(serde_json::json!({
                        "id": 1, "name": "r", "full_name": "o/r", "owner": {"login": "o"},
                        "private": false, "html_url": "https://github.com/o/r",
                        "default_branch": "main"
                    }))
                }),
            )
            .route(
                "/repos/o/r/git/ref/heads/{*branch}",
                get(
                    |axum::extract::Path(branch): axum::extract::Path<String>| async move {
                        if branch == "main" {
                            Json(serde_json::json!({
                                "ref": "refs/heads/main",
                                "object": {"sha": "c1", "type": "commit"}
                            }))
                            .into_response()
                        } else {
                            (StatusCode::NOT_FOUND, r#"{"message":"Not Found"}"#).into_response()
                        }
                    },
                ),
            )
            .route(
                "/repos/o/r/git/commits/{sha}",
                get(
                    |axum::extract::Path(sha): axum::extract::Path<String>| async move {
                        Json(serde_json::json!({"sha": sha, "tree": {"sha": "t1"}}))
                    },
                ),
            )
            .route(
                "/repos/o/r/git/trees/t1",
                get(move || {
                    let tree_json = tree_json.clone();
                    async move { Json(tree_json) }
                }),
            )
    }

    #[tokio::test]
    async fn discovers_files_on_default_branch() {
        let fake = FakeGitHub::start(repo_router(serde_json::json!({
            "sha": "t1",
            "truncated": false,
            "tree": [
                {"path": ".github", "type": "tree", "sha": "a"},
                {"path": ".github/workflows/ci.yml", "type": "blob", "sha": "b", "size": 10},
                {"path": "README.md", "type": "blob", "sha": "c", "size": 20},
                {"path": "notes.yaml", "type": "blob", "sha": "d", "size": 5}
            ]
        })))
        .await;
        let github = GitHubClient::new(reqwest::Client::new(), &fake.url);

        let found = discover_config_files(&github, "t", "o", "r", None)
            .await
            .unwrap();
        assert_eq!(found.git_ref, "main");
        assert_eq!(found.commit_sha, "c1");
        assert_eq!(
            found.files,
            vec![".github/workflows/ci.yml".to_string(), "notes.yaml".to_string()]
        );
        assert!(!found.truncated);
    }

    #[tokio::test]
    async fn truncated_flag_propagates_even_with_no_matches() {
        let fake = FakeGitHub::start(repo_router(serde_json::json!({
            "sha": "t1",
            "truncated": true,
            "tree": [{"path": "src/lib.rs", "type": "blob", "sha": "x", "size": 1}]
        })))
        .await;
        let github = GitHubClient::new(reqwest::Client::new(), &fake.url);

        let found = discover_config_files(&github, "t", "o", "r", Some("main"))
            .await
            .unwrap();
        assert!(found.files.is_empty());
        assert!(found.truncated);
    }

    #[tokio::test]
    async fn non_branch_ref_is_used_as_commit_sha() {
        let fake = FakeGitHub::start(repo_router(serde_json::json!({
            "sha": "t1", "truncated": false, "tree": []
        })))
        .await;
        let github = GitHubClient::new(reqwest::Client::new(), &fake.url);

        let found = discover_config_files(&github, "t", "o", "r", Some("deadbeef"))
            .await
            .unwrap();
        assert_eq!(found.git_ref, "deadbeef");
        assert_eq!(found.commit_sha, "deadbeef");
    }

    #[tokio::test]
    async fn upstream_failure_is_propagated() {
        let fake = FakeGitHub::start(axum::Router::new().route(
            "/repos/o/r",
            get(|| async { (StatusCode::FORBIDDEN, "Resource not accessible") }),
        ))
        .await;
        let github = GitHubClient::new(reqwest::Client::new(), &fake.url);

        let err = discover_config_files(&github, "t", "o", "r", None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Upstream { status: Some(403), .. }));
    }
}
