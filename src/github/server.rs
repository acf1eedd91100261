use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tracing::Instrument;

use crate::github::webhook::parse_pull_request_event;
use crate::github::WebhookSecret;
use crate::relay::{Relay, RelayOutcome, Skip};
use crate::utils::logging::LogError;

/// Shared server state for all axum handlers.
pub struct ServerState {
    relay: Relay,
    webhook_secret: WebhookSecret,
}

impl ServerState {
    pub fn new(relay: Relay, webhook_secret: WebhookSecret) -> Self {
        Self {
            relay,
            webhook_secret,
        }
    }

    pub fn get_webhook_secret(&self) -> &WebhookSecret {
        &self.webhook_secret
    }
}

pub type ServerStateRef = Arc<ServerState>;

pub fn create_app(state: ServerState) -> Router {
    Router::new()
        .route("/github", post(github_webhook_handler))
        .route("/health", get(health_handler))
        .layer(ConcurrencyLimitLayer::new(100))
        .with_state(Arc::new(state))
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "")
}

/// What the relay answers to a webhook delivery.
///
/// Business outcomes are always answered with 200, so that GitHub does not mark the
/// delivery as failed.
#[derive(Debug)]
pub enum WebhookResponse {
    Unauthenticated,
    MalformedPayload,
    Relayed(RelayOutcome),
}

impl IntoResponse for WebhookResponse {
    fn into_response(self) -> Response {
        match self {
            WebhookResponse::Unauthenticated => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
            WebhookResponse::MalformedPayload => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
            WebhookResponse::Relayed(outcome) => {
                let body = match outcome {
                    RelayOutcome::Skipped(Skip::Ignored) => "Unsupported action".to_string(),
                    RelayOutcome::Skipped(Skip::UnknownLabel(_)) => {
                        "Unsupported label received".to_string()
                    }
                    RelayOutcome::Skipped(Skip::UnsupportedRepository(_)) => {
                        "Unsupported repo".to_string()
                    }
                    RelayOutcome::Dispatched(_) => "bamboo was invoked".to_string(),
                    RelayOutcome::DispatchFailed(error) => error.to_string(),
                };
                (StatusCode::OK, body).into_response()
            }
        }
    }
}

/// Axum handler that receives a pull request webhook and triggers the matching Bamboo plan.
pub async fn github_webhook_handler(
    State(state): State<ServerStateRef>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookResponse {
    if let Err(error) = state.get_webhook_secret().authenticate(&headers) {
        tracing::warn!("Webhook request failed, could not authenticate webhook: {error}");
        return WebhookResponse::Unauthenticated;
    }

    let event = match parse_pull_request_event(&body) {
        Ok(event) => event,
        Err(error) => {
            tracing::error!("Could not parse webhook payload: {error}");
            return WebhookResponse::MalformedPayload;
        }
    };

    let span = tracing::info_span!(
        "Webhook",
        action = %event.action,
        pr = %event.pull_request.number,
        repository = %event.pull_request.head_repository,
        sender = %event.sender
    );
    span.in_scope(|| {
        tracing::debug!(
            head_ref = %event.pull_request.head.name,
            sha = %event.pull_request.head.sha,
            "Received pull request event"
        );
    });

    let outcome = state.relay.handle(&event).instrument(span.clone()).await;
    if let RelayOutcome::DispatchFailed(error) = &outcome {
        span.log_error(anyhow::anyhow!("Cannot trigger Bamboo: {error}"));
    }
    WebhookResponse::Relayed(outcome)
}
