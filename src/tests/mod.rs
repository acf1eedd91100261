mod mocks;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use crate::bamboo::{BambooClient, BambooCredentials};
use crate::config::RelayConfig;
use crate::github::{
    Branch, CommitSha, PullRequest, PullRequestAction, PullRequestEvent, WebhookSecret,
};
use crate::github::server::{create_app, ServerState};
use crate::relay::Relay;

pub use io::load_test_file;
pub use mocks::{BambooMockServer, TEST_BAMBOO_PASSWORD, TEST_BAMBOO_USERNAME};
pub use webhook::{create_webhook_request, PullRequestPayload, TEST_WEBHOOK_SECRET};

/// Creates an event of pull request #12 of the `lynx` repository.
pub fn pull_request_event(
    action: PullRequestAction,
    sender: &str,
    head_ref: &str,
) -> PullRequestEvent {
    PullRequestEvent {
        action,
        label: None,
        sender: sender.to_string(),
        pull_request: PullRequest {
            number: 12.into(),
            head: Branch {
                name: head_ref.to_string(),
                sha: CommitSha("c9abcadf285659684c0975cead8bf982fa84e123".to_string()),
            },
            head_repository: "lynx".to_string(),
            base_ref: "master".to_string(),
        },
    }
}

/// The relay server wired to a fake Bamboo.
pub struct RelayTester {
    app: Router,
    bamboo: BambooMockServer,
}

impl RelayTester {
    pub async fn start() -> Self {
        Self::with_request_timeout(Duration::from_secs(2)).await
    }

    pub async fn with_request_timeout(timeout: Duration) -> Self {
        let bamboo = BambooMockServer::start().await;
        let config =
            RelayConfig::parse(&format!("bamboo_url = \"{}\"", bamboo.base_url())).unwrap();
        let relay = Relay::new(
            Arc::new(config),
            BambooCredentials::new(
                TEST_BAMBOO_USERNAME.to_string(),
                TEST_BAMBOO_PASSWORD.to_string(),
            ),
            Arc::new(BambooClient::new(timeout).unwrap()),
        );
        let state = ServerState::new(relay, WebhookSecret::new(TEST_WEBHOOK_SECRET.to_string()));
        Self {
            app: create_app(state),
            bamboo,
        }
    }

    pub fn bamboo(&self) -> &BambooMockServer {
        &self.bamboo
    }

    /// Sends a request to the relay and returns its status and body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    pub async fn send_payload(&self, payload: PullRequestPayload) -> (StatusCode, String) {
        self.send(payload.request()).await
    }
}
