use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::config::RelayConfig;
use crate::github::{PullRequestAction, PullRequestEvent};

/// A test intent signalled by a label on a pull request.
///
/// Declaration order is the priority order used when several flags are set at once:
/// the earliest variant wins.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TestFlag {
    Init,
    InitLite,
    Build,
    Sonar,
    Spring,
    Integration,
    UiUnit,
    UnitWeb,
    Update,
    IntLite,
    /// Re-run requested by a privileged user. Has no plan postfix of its own.
    Restart,
}

impl TestFlag {
    pub const ALL: [TestFlag; 11] = [
        TestFlag::Init,
        TestFlag::InitLite,
        TestFlag::Build,
        TestFlag::Sonar,
        TestFlag::Spring,
        TestFlag::Integration,
        TestFlag::UiUnit,
        TestFlag::UnitWeb,
        TestFlag::Update,
        TestFlag::IntLite,
        TestFlag::Restart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestFlag::Init => "init",
            TestFlag::InitLite => "initLite",
            TestFlag::Build => "build",
            TestFlag::Sonar => "sonar",
            TestFlag::Spring => "spring",
            TestFlag::Integration => "integration",
            TestFlag::UiUnit => "uiUnit",
            TestFlag::UnitWeb => "unitWeb",
            TestFlag::Update => "update",
            TestFlag::IntLite => "intLite",
            TestFlag::Restart => "restart",
        }
    }

    pub fn is_restart(&self) -> bool {
        matches!(self, TestFlag::Restart)
    }
}

impl Display for TestFlag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestFlag {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        TestFlag::ALL
            .into_iter()
            .find(|flag| flag.as_str() == value)
            .ok_or_else(|| value.to_string())
    }
}

/// Flags collected while handling a single webhook.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelFlags(BTreeSet<TestFlag>);

impl LabelFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, flag: TestFlag) {
        self.0.insert(flag);
    }

    pub fn contains(&self, flag: TestFlag) -> bool {
        self.0.contains(&flag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the flags in priority order.
    pub fn iter(&self) -> impl Iterator<Item = TestFlag> + '_ {
        self.0.iter().copied()
    }

    /// True when no flag other than [`TestFlag::Restart`] is set.
    /// Such flag sets let privileged users override the selected plan.
    pub fn allows_override(&self) -> bool {
        self.is_empty() || self.contains(TestFlag::Restart)
    }
}

impl FromIterator<TestFlag> for LabelFlags {
    fn from_iter<T: IntoIterator<Item = TestFlag>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum LabelOutcome {
    /// The event is not a `labeled` event.
    Unchanged,
    Inserted(TestFlag),
    /// The restart label was added by a user that is not allowed to restart builds.
    RestartDenied,
    /// The label is not part of the label table. Handling of the webhook should stop.
    Unknown(String),
}

/// Records the test intent of a `labeled` event in `flags`.
pub fn accumulate_label(
    flags: &mut LabelFlags,
    event: &PullRequestEvent,
    config: &RelayConfig,
) -> LabelOutcome {
    if event.action != PullRequestAction::Labeled {
        return LabelOutcome::Unchanged;
    }

    let name = event.label.as_deref().unwrap_or_default();
    let Some(flag) = config.flag_for_label(name) else {
        tracing::warn!(label = name, "Labeled action with unknown label name, skipping");
        return LabelOutcome::Unknown(name.to_string());
    };

    if flag.is_restart() && !config.is_privileged(&event.sender) {
        tracing::info!(
            sender = %event.sender,
            "Restart label added by unprivileged user, ignoring it"
        );
        return LabelOutcome::RestartDenied;
    }

    tracing::info!("Labeled action with '{name}' label, setting {flag} flag");
    flags.insert(flag);
    LabelOutcome::Inserted(flag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::pull_request_event;

    fn labeled(label: &str, sender: &str) -> PullRequestEvent {
        let mut event = pull_request_event(PullRequestAction::Labeled, sender, "feature");
        event.label = Some(label.to_string());
        event
    }

    #[test]
    fn flag_names_roundtrip() {
        for flag in TestFlag::ALL {
            assert_eq!(flag.as_str().parse::<TestFlag>(), Ok(flag));
        }
        assert_eq!("unit".parse::<TestFlag>(), Err("unit".to_string()));
    }

    #[test]
    fn flags_iterate_in_priority_order() {
        let flags: LabelFlags = [TestFlag::Restart, TestFlag::Update, TestFlag::Init]
            .into_iter()
            .collect();
        assert_eq!(
            flags.iter().collect::<Vec<_>>(),
            vec![TestFlag::Init, TestFlag::Update, TestFlag::Restart]
        );
    }

    #[test]
    fn allows_override() {
        assert!(LabelFlags::new().allows_override());
        assert!([TestFlag::Restart, TestFlag::Build]
            .into_iter()
            .collect::<LabelFlags>()
            .allows_override());
        assert!(!std::iter::once(TestFlag::Build)
            .collect::<LabelFlags>()
            .allows_override());
    }

    #[test]
    fn non_labeled_event_keeps_flags() {
        let mut flags = LabelFlags::new();
        let event = pull_request_event(PullRequestAction::Opened, "user1", "feature");
        assert_eq!(
            accumulate_label(&mut flags, &event, &RelayConfig::default()),
            LabelOutcome::Unchanged
        );
        assert!(flags.is_empty());
    }

    #[test]
    fn known_label_sets_flag() {
        let mut flags = LabelFlags::new();
        assert_eq!(
            accumulate_label(
                &mut flags,
                &labeled("run init test", "user3"),
                &RelayConfig::default()
            ),
            LabelOutcome::Inserted(TestFlag::Init)
        );
        assert_eq!(flags.iter().collect::<Vec<_>>(), vec![TestFlag::Init]);
    }

    #[test]
    fn every_reference_label_maps_to_its_flag() {
        let config = RelayConfig::default();
        let labels = [
            ("run init test", TestFlag::Init),
            ("run init-lite test", TestFlag::InitLite),
            ("run build test", TestFlag::Build),
            ("run sonar test", TestFlag::Sonar),
            ("run spring test", TestFlag::Spring),
            ("run integration test", TestFlag::Integration),
            ("run ui unit test", TestFlag::UiUnit),
            ("run unit + web test", TestFlag::UnitWeb),
            ("run update test", TestFlag::Update),
            ("run integration-lite test", TestFlag::IntLite),
        ];
        for (label, flag) in labels {
            let mut flags = LabelFlags::new();
            accumulate_label(&mut flags, &labeled(label, "user3"), &config);
            assert!(flags.contains(flag), "{label} should set {flag}");
        }
    }

    #[test]
    fn restart_from_privileged_user() {
        let mut flags = LabelFlags::new();
        assert_eq!(
            accumulate_label(
                &mut flags,
                &labeled("RESTARTED", "user2"),
                &RelayConfig::default()
            ),
            LabelOutcome::Inserted(TestFlag::Restart)
        );
        assert!(flags.contains(TestFlag::Restart));
    }

    #[test]
    fn restart_from_unprivileged_user() {
        let mut flags = LabelFlags::new();
        assert_eq!(
            accumulate_label(
                &mut flags,
                &labeled("RESTARTED", "user3"),
                &RelayConfig::default()
            ),
            LabelOutcome::RestartDenied
        );
        assert!(flags.is_empty());
    }

    #[test]
    fn unknown_label() {
        let mut flags = LabelFlags::new();
        assert_eq!(
            accumulate_label(
                &mut flags,
                &labeled("needs review", "user1"),
                &RelayConfig::default()
            ),
            LabelOutcome::Unknown("needs review".to_string())
        );
        assert!(flags.is_empty());
    }

    #[test]
    fn label_names_are_case_sensitive() {
        let mut flags = LabelFlags::new();
        assert!(matches!(
            accumulate_label(
                &mut flags,
                &labeled("restarted", "user1"),
                &RelayConfig::default()
            ),
            LabelOutcome::Unknown(_)
        ));
    }

    #[test]
    fn labeled_without_label_is_unknown() {
        let mut flags = LabelFlags::new();
        let event = pull_request_event(PullRequestAction::Labeled, "user1", "feature");
        assert_eq!(
            accumulate_label(&mut flags, &event, &RelayConfig::default()),
            LabelOutcome::Unknown(String::new())
        );
    }
}
