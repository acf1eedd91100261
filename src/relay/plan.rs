use crate::config::RelayConfig;
use crate::relay::labels::LabelFlags;
use crate::relay::{PlanName, ProjectCode};

/// Plan used when no label or user override applies.
pub const DEFAULT_POSTFIX: &str = "RT";
/// Plan for privileged users on regular branches.
pub const PRIVILEGED_POSTFIX: &str = "RTWM";
/// Plan for privileged users on UI branches.
pub const PRIVILEGED_UI_POSTFIX: &str = "RTWMU";
/// Plan for everybody else on UI branches.
pub const UI_POSTFIX: &str = "RTU";

/// Selects the Bamboo plan that should run for a pull request.
///
/// Label flags pick a dedicated plan (the highest priority flag wins), but they are
/// overridden by the branch and user rules:
/// - on branches starting with the UI prefix, unprivileged users always get the UI plan
///   and privileged users get the privileged UI plan unless they asked for a specific
///   test,
/// - on other branches, privileged users get the privileged plan unless they asked for a
///   specific test.
///
/// A restart flag never counts as asking for a specific test.
pub fn select_plan(
    config: &RelayConfig,
    project: &ProjectCode,
    flags: &LabelFlags,
    head_ref: &str,
    actor: &str,
) -> PlanName {
    let mut plan = project.plan(DEFAULT_POSTFIX);

    let labeled_plan = flags
        .iter()
        .filter(|flag| !flag.is_restart())
        .find_map(|flag| config.postfix_for(flag).map(|postfix| (flag, postfix)));
    if let Some((flag, postfix)) = labeled_plan {
        plan = project.plan(postfix);
        tracing::info!("{flag} test detected, rewriting default plan to {plan}");
    }

    let privileged = config.is_privileged(actor);
    if head_ref.starts_with(config.ui_branch_prefix()) {
        if privileged {
            if flags.allows_override() {
                plan = project.plan(PRIVILEGED_UI_POSTFIX);
                tracing::info!(
                    "UI branch pushed by privileged user without test labels, plan is {plan}"
                );
            }
        } else {
            plan = project.plan(UI_POSTFIX);
            tracing::info!("UI branch pushed by regular user (labels ignored), plan is {plan}");
        }
    } else if flags.allows_override() && privileged {
        plan = project.plan(PRIVILEGED_POSTFIX);
        tracing::info!("Privileged user without test labels, plan is {plan}");
    }

    plan
}
