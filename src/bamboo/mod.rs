//! Composes and sends the requests that queue Bamboo plans.
use std::fmt::{Debug, Formatter};
use std::time::Duration;

use axum::async_trait;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::github::PullRequestEvent;
use crate::relay::PlanName;

mod client;

pub use client::{BambooClient, DryRunDispatcher};

/// How long do we wait for Bamboo to answer.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_BAMBOO_USERNAME: &str = "bambooUserName";
pub const DEFAULT_BAMBOO_PASSWORD: &str = "BambooPassword";

pub const PULL_NUMBER_PARAM: &str = "bamboo.variable.pull_num";
pub const PULL_EVENT_PARAM: &str = "bamboo.variable.pull_event";
pub const SENDER_LOGIN_PARAM: &str = "bamboo.variable.sender_login";
pub const PULL_BASE_REF_PARAM: &str = "bamboo.variable.pull_base_ref";
pub const PULL_SHA_PARAM: &str = "bamboo.variable.pull_sha";

/// Basic auth credentials of the Bamboo user that queues builds.
#[derive(Clone)]
pub struct BambooCredentials {
    username: String,
    password: SecretString,
}

impl BambooCredentials {
    pub fn new(username: String, password: String) -> Self {
        Self {
            username,
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret().as_str()
    }
}

impl Default for BambooCredentials {
    fn default() -> Self {
        Self::new(
            DEFAULT_BAMBOO_USERNAME.to_string(),
            DEFAULT_BAMBOO_PASSWORD.to_string(),
        )
    }
}

impl Debug for BambooCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BambooCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A POST request that queues a build of a single plan. It has no body.
#[derive(Clone, Debug)]
pub struct BambooRequest {
    pub plan: PlanName,
    /// Plan URL including the build variables as query parameters.
    pub url: Url,
    pub credentials: BambooCredentials,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Cannot create Bamboo URL for plan {plan}: {source}")]
    InvalidUrl {
        plan: PlanName,
        #[source]
        source: url::ParseError,
    },
    #[error("Bamboo did not answer within {}s", .0.as_secs_f64())]
    Timeout(Duration),
    #[error("Cannot send request to Bamboo: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Bamboo responded with {0}")]
    Status(reqwest::StatusCode),
}

/// Sends composed requests to Bamboo.
#[async_trait]
pub trait BambooDispatcher: Send + Sync {
    async fn dispatch(&self, request: &BambooRequest) -> Result<(), DispatchError>;
}

/// Builds the request that queues `plan` for the pull request of `event`.
pub fn compose_request(
    base_url: &Url,
    credentials: &BambooCredentials,
    plan: &PlanName,
    event: &PullRequestEvent,
) -> Result<BambooRequest, DispatchError> {
    let mut url =
        Url::parse(&format!("{base_url}{plan}")).map_err(|source| DispatchError::InvalidUrl {
            plan: plan.clone(),
            source,
        })?;

    let pr = &event.pull_request;
    url.query_pairs_mut()
        .clear()
        .append_pair(PULL_NUMBER_PARAM, &pr.number.to_string())
        .append_pair(PULL_EVENT_PARAM, event.action.as_str())
        .append_pair(SENDER_LOGIN_PARAM, &event.sender)
        .append_pair(PULL_BASE_REF_PARAM, &pr.base_ref)
        .append_pair(PULL_SHA_PARAM, pr.head.sha.as_ref());

    Ok(BambooRequest {
        plan: plan.clone(),
        url,
        credentials: credentials.clone(),
    })
}
