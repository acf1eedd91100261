use axum::http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};

use crate::github::{Branch, CommitSha, PullRequest, PullRequestAction, PullRequestEvent};

/// Header that carries the shared webhook secret.
pub const SECRET_HEADER: &str = "x-hub-signature";

#[derive(serde::Deserialize, Debug, Default)]
#[serde(default)]
struct WebhookLabel {
    name: String,
}

#[derive(serde::Deserialize, Debug, Default)]
#[serde(default)]
struct WebhookUser {
    login: String,
}

#[derive(serde::Deserialize, Debug, Default)]
#[serde(default)]
struct WebhookRepository {
    full_name: String,
}

#[derive(serde::Deserialize, Debug, Default)]
#[serde(default)]
struct WebhookHead {
    #[serde(rename = "ref")]
    name: String,
    sha: String,
    repo: WebhookRepository,
}

#[derive(serde::Deserialize, Debug, Default)]
#[serde(default)]
struct WebhookBase {
    #[serde(rename = "ref")]
    name: String,
}

#[derive(serde::Deserialize, Debug, Default)]
#[serde(default)]
struct WebhookPullRequestInner {
    number: u64,
    head: WebhookHead,
    base: WebhookBase,
}

/// Missing fields decode to empty values, so deliveries that are not pull request
/// events (pings, other event types) end up as an unsupported action.
#[derive(serde::Deserialize, Debug)]
struct WebhookPullRequest {
    #[serde(default)]
    action: String,
    #[serde(default)]
    label: Option<WebhookLabel>,
    #[serde(default)]
    sender: WebhookUser,
    #[serde(default)]
    pull_request: WebhookPullRequestInner,
}

impl From<WebhookPullRequest> for PullRequestEvent {
    fn from(payload: WebhookPullRequest) -> Self {
        let WebhookPullRequest {
            action,
            label,
            sender,
            pull_request,
        } = payload;
        PullRequestEvent {
            action: PullRequestAction::from(action),
            label: label.map(|label| label.name),
            sender: sender.login,
            pull_request: PullRequest {
                number: pull_request.number.into(),
                head: Branch {
                    name: pull_request.head.name,
                    sha: CommitSha(pull_request.head.sha),
                },
                head_repository: pull_request.head.repo.full_name,
                base_ref: pull_request.base.name,
            },
        }
    }
}

/// Decodes the body of a `pull_request` webhook.
pub fn parse_pull_request_event(body: &[u8]) -> Result<PullRequestEvent, serde_json::Error> {
    let payload: WebhookPullRequest = serde_json::from_slice(body)?;
    Ok(payload.into())
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("x-hub-signature header not found")]
    MissingSecret,
    #[error("x-hub-signature header does not match the configured secret")]
    SecretMismatch,
}

/// Wrapper for a secret which is zeroed on drop and can be exposed only through the [`WebhookSecret::expose`] method.
pub struct WebhookSecret(SecretString);

impl WebhookSecret {
    pub fn new(secret: String) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret().as_str()
    }

    /// Checks that the request carries this secret in the [`SECRET_HEADER`] header.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let Some(value) = headers.get(SECRET_HEADER) else {
            return Err(AuthError::MissingSecret);
        };
        if value.as_bytes() == self.expose().as_bytes() {
            Ok(())
        } else {
            Err(AuthError::SecretMismatch)
        }
    }
}
