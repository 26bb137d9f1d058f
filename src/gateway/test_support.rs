//! In-process stand-in for the GitHub API, used by unit tests.

use axum::Router;
use tokio::task::JoinHandle;

use super::session::SessionIdentity;

/// PKCS#1 RSA key used to sign App assertions in tests.
pub const TEST_APP_KEY: &str = include_str!("../../tests/fixtures/app-key.pem");
/// Public half of [`TEST_APP_KEY`].
pub const TEST_APP_PUBLIC_KEY: &str = include_str!("../../tests/fixtures/app-key.pub.pem");

/// An axum router served on an ephemeral localhost port.
pub struct FakeGitHub {
    pub url: String,
    handle: JoinHandle<()>,
}

impl FakeGitHub {
    pub async fn start(router: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake GitHub listener");
        let addr = listener.local_addr().expect("fake GitHub local addr");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Self {
            url: format!("http://{}", addr),
            handle,
        }
    }
}

impl Drop for FakeGitHub {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn octocat() -> SessionIdentity {
    SessionIdentity {
        github_id: 583231,
        login: "octocat".to_string(),
        name: Some("The Octocat".to_string()),
        email: Some("octocat@github.com".to_string()),
        avatar_url: None,
    }
}
