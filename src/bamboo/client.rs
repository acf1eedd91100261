use std::time::Duration;

use anyhow::Context;
use axum::async_trait;

use crate::bamboo::{BambooDispatcher, BambooRequest, DispatchError};

/// Queues Bamboo builds over HTTP.
pub struct BambooClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl BambooClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Cannot build Bamboo HTTP client")?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl BambooDispatcher for BambooClient {
    async fn dispatch(&self, request: &BambooRequest) -> Result<(), DispatchError> {
        tracing::debug!("Bamboo will be triggered: {}", request.url);

        let response = self
            .client
            .post(request.url.clone())
            .basic_auth(
                request.credentials.username(),
                Some(request.credentials.password()),
            )
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    DispatchError::Timeout(self.timeout)
                } else {
                    DispatchError::Transport(error)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Status(status));
        }
        tracing::debug!(plan = %request.plan, status = %status, "Bamboo accepted the request");
        Ok(())
    }
}

/// Only logs the requests that would be sent to Bamboo.
pub struct DryRunDispatcher;

#[async_trait]
impl BambooDispatcher for DryRunDispatcher {
    async fn dispatch(&self, request: &BambooRequest) -> Result<(), DispatchError> {
        tracing::info!(plan = %request.plan, "Dry run, Bamboo would be triggered: {}", request.url);
        Ok(())
    }
}
