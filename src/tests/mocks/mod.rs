use std::time::Duration;

use url::Url;
use wiremock::matchers::{basic_auth, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_BAMBOO_USERNAME: &str = "bamboo-bot";
pub const TEST_BAMBOO_PASSWORD: &str = "bamboo-password";

const QUEUE_PATH: &str = "/rest/api/latest/queue/";

/// Fake Bamboo server that accepts plan triggers.
pub struct BambooMockServer {
    mock_server: MockServer,
}

impl BambooMockServer {
    pub async fn start() -> Self {
        Self {
            mock_server: MockServer::start().await,
        }
    }

    pub fn base_url(&self) -> Url {
        Url::parse(&format!("{}{QUEUE_PATH}", self.mock_server.uri())).unwrap()
    }

    /// Expects `plan` to be triggered exactly `times` times.
    pub async fn expect_plan(&self, plan: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path(format!("{QUEUE_PATH}{plan}")))
            .and(basic_auth(TEST_BAMBOO_USERNAME, TEST_BAMBOO_PASSWORD))
            .respond_with(ResponseTemplate::new(200))
            .expect(times)
            .mount(&self.mock_server)
            .await;
    }

    /// Answers every trigger with the given status.
    pub async fn respond_with_status(&self, status: u16) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.mock_server)
            .await;
    }

    /// Accepts every trigger, but only after `delay`.
    pub async fn respond_with_delay(&self, delay: Duration) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(delay))
            .mount(&self.mock_server)
            .await;
    }

    /// Plans that were triggered, in the order in which they were triggered.
    pub async fn triggered_plans(&self) -> Vec<String> {
        self.mock_server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter_map(|request| {
                request
                    .url
                    .path()
                    .strip_prefix(QUEUE_PATH)
                    .map(|plan| plan.to_string())
            })
            .collect()
    }
}
