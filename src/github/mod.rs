//! Contains definitions of the pull request types (event, branch, commit sha, PR number)
//! carried by the GitHub webhooks that the relay receives.
use std::fmt::{Debug, Display, Formatter};

pub mod server;
pub mod webhook;

pub use webhook::WebhookSecret;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitSha(pub String);

impl From<String> for CommitSha {
    fn from(value: String) -> Self {
        Self(value)
    }
}
impl AsRef<str> for CommitSha {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}
impl Display for CommitSha {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PullRequestNumber(pub u64);

impl From<u64> for PullRequestNumber {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Display for PullRequestNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        <u64 as Display>::fmt(&self.0, f)
    }
}

/// The `action` field of a `pull_request` webhook.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(from = "String")]
pub enum PullRequestAction {
    Opened,
    Reopened,
    Synchronize,
    Labeled,
    /// Any action the relay does not know by name (`closed`, `edited`, ...).
    Other(String),
}

impl PullRequestAction {
    pub fn as_str(&self) -> &str {
        match self {
            PullRequestAction::Opened => "opened",
            PullRequestAction::Reopened => "reopened",
            PullRequestAction::Synchronize => "synchronize",
            PullRequestAction::Labeled => "labeled",
            PullRequestAction::Other(action) => action.as_str(),
        }
    }
}

impl From<&str> for PullRequestAction {
    fn from(value: &str) -> Self {
        match value {
            "opened" => PullRequestAction::Opened,
            "reopened" => PullRequestAction::Reopened,
            "synchronize" => PullRequestAction::Synchronize,
            "labeled" => PullRequestAction::Labeled,
            other => PullRequestAction::Other(other.to_string()),
        }
    }
}

impl From<String> for PullRequestAction {
    fn from(value: String) -> Self {
        value.as_str().into()
    }
}

impl Display for PullRequestAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
    pub sha: CommitSha,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequest {
    pub number: PullRequestNumber,
    pub head: Branch,
    /// Full name of the repository the head branch lives in.
    pub head_repository: String,
    pub base_ref: String,
}

/// A single `pull_request` webhook delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequestEvent {
    pub action: PullRequestAction,
    /// Name of the label that was added, only sent with `labeled` actions.
    pub label: Option<String>,
    /// Login of the user that caused the event.
    pub sender: String,
    pub pull_request: PullRequest,
}
