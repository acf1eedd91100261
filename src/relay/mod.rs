//! Decides which Bamboo plan a pull request event should trigger and triggers it.
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::bamboo::{compose_request, BambooCredentials, BambooDispatcher, DispatchError};
use crate::config::RelayConfig;
use crate::github::PullRequestEvent;

pub mod labels;
pub mod plan;

pub use labels::{accumulate_label, LabelFlags, LabelOutcome, TestFlag};
pub use plan::select_plan;

/// Short Bamboo project key of a repository (e.g. `AM`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectCode(String);

impl ProjectCode {
    pub fn new(code: &str) -> Self {
        Self(code.to_string())
    }

    /// Name of the plan `{project}-{postfix}`.
    pub fn plan(&self, postfix: &str) -> PlanName {
        PlanName(format!("{}-{postfix}", self.0))
    }
}

impl Display for ProjectCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a Bamboo plan, e.g. `AM-RTIO`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanName(String);

impl Display for PlanName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reason why an event does not trigger any plan.
#[derive(Debug, PartialEq, Eq)]
pub enum Skip {
    /// The action is not one of the actionable actions.
    Ignored,
    UnknownLabel(String),
    /// The repository has no Bamboo project.
    UnsupportedRepository(String),
}

#[derive(Debug)]
pub enum RelayOutcome {
    Skipped(Skip),
    Dispatched(PlanName),
    DispatchFailed(DispatchError),
}

/// Works out the plan for a single event.
///
/// The label flags live only for the duration of this call.
pub fn plan_for_event(config: &RelayConfig, event: &PullRequestEvent) -> Result<PlanName, Skip> {
    if !config.is_actionable(&event.action) {
        tracing::debug!(action = %event.action, "Ignoring unsupported action");
        return Err(Skip::Ignored);
    }

    let mut flags = LabelFlags::new();
    if let LabelOutcome::Unknown(label) = accumulate_label(&mut flags, event, config) {
        return Err(Skip::UnknownLabel(label));
    }

    let repository = &event.pull_request.head_repository;
    let Some(project) = config.project_for(repository) else {
        tracing::warn!(repository = %repository, "Unsupported repository");
        return Err(Skip::UnsupportedRepository(repository.clone()));
    };

    Ok(select_plan(
        config,
        project,
        &flags,
        &event.pull_request.head.name,
        &event.sender,
    ))
}

/// Everything needed to turn webhooks into Bamboo builds.
pub struct Relay {
    config: Arc<RelayConfig>,
    credentials: BambooCredentials,
    dispatcher: Arc<dyn BambooDispatcher>,
}

impl Relay {
    pub fn new(
        config: Arc<RelayConfig>,
        credentials: BambooCredentials,
        dispatcher: Arc<dyn BambooDispatcher>,
    ) -> Self {
        Self {
            config,
            credentials,
            dispatcher,
        }
    }

    pub async fn handle(&self, event: &PullRequestEvent) -> RelayOutcome {
        let plan = match plan_for_event(&self.config, event) {
            Ok(plan) => plan,
            Err(skip) => return RelayOutcome::Skipped(skip),
        };

        let request = match compose_request(
            self.config.bamboo_url(),
            &self.credentials,
            &plan,
            event,
        ) {
            Ok(request) => request,
            Err(error) => return RelayOutcome::DispatchFailed(error),
        };

        tracing::info!(plan = %plan, "Triggering Bamboo plan");
        match self.dispatcher.dispatch(&request).await {
            Ok(()) => RelayOutcome::Dispatched(plan),
            Err(error) => RelayOutcome::DispatchFailed(error),
        }
    }
}
