use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use url::Url;

use crate::github::PullRequestAction;
use crate::relay::{ProjectCode, TestFlag};

pub const DEFAULT_BAMBOO_URL: &str = "https://bamboo.com/path/to/api/";
pub const DEFAULT_UI_BRANCH_PREFIX: &str = "ui/";

const DEFAULT_ACTIONABLE_ACTIONS: [&str; 4] = ["opened", "labeled", "reopened", "synchronize"];
const DEFAULT_PRIVILEGED_ACTORS: [&str; 2] = ["user1", "user2"];
const DEFAULT_PROJECTS: [(&str, &str); 4] = [
    ("lynx", "AM"),
    ("lynx-ru", "AER"),
    ("lynx-in", "AEI"),
    ("pymhd/go-simple-cache", "MHD"),
];
const DEFAULT_LABELS: [(&str, TestFlag); 11] = [
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
    ("RESTARTED", TestFlag::Restart),
];
const DEFAULT_POSTFIXES: [(TestFlag, &str); 10] = [
    (TestFlag::Init, "RTIO"),
    (TestFlag::InitLite, "RTILTO"),
    (TestFlag::Build, "RTBTO"),
    (TestFlag::Sonar, "RTSTO"),
    (TestFlag::Spring, "RTSCTO"),
    (TestFlag::Integration, "RTITO"),
    (TestFlag::UiUnit, "RTUUTO"),
    (TestFlag::UnitWeb, "RTUWTO"),
    (TestFlag::Update, "RTUTO"),
    (TestFlag::IntLite, "RTILO"),
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid Bamboo URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Unknown test flag {0:?}")]
    UnknownFlag(String),
    #[error("Label {label:?} sets the {flag} flag, which has no plan postfix")]
    MissingPostfix { label: String, flag: TestFlag },
    #[error("The restart flag cannot have a plan postfix")]
    RestartPostfix,
    #[error("UI branch prefix cannot be empty")]
    EmptyBranchPrefix,
}

/// Contents of a relay config file.
///
/// Every table that is present replaces the built-in table, missing tables keep the
/// built-in values.
#[derive(serde::Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct RelayConfigFile {
    bamboo_url: Option<String>,
    ui_branch_prefix: Option<String>,
    actionable_actions: Option<Vec<PullRequestAction>>,
    privileged_actors: Option<Vec<String>>,
    projects: Option<HashMap<String, String>>,
    labels: Option<HashMap<String, String>>,
    postfixes: Option<HashMap<String, String>>,
}

/// Static tables that drive plan selection.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    bamboo_url: Url,
    ui_branch_prefix: String,
    actionable_actions: HashSet<PullRequestAction>,
    privileged_actors: HashSet<String>,
    /// Repository full name -> Bamboo project.
    projects: HashMap<String, ProjectCode>,
    /// Label name -> flag.
    labels: HashMap<String, TestFlag>,
    postfixes: HashMap<TestFlag, String>,
}

impl RelayConfig {
    /// Loads the config from a TOML file, falling back to the built-in tables for
    /// anything the file does not define.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: RelayConfigFile = toml::from_str(content)?;
        Self::from_file(file)
    }

    fn from_file(file: RelayConfigFile) -> Result<Self, ConfigError> {
        let mut config = RelayConfig::default();
        if let Some(url) = file.bamboo_url {
            config.bamboo_url = parse_bamboo_url(&url)?;
        }
        if let Some(prefix) = file.ui_branch_prefix {
            config.ui_branch_prefix = prefix;
        }
        if let Some(actions) = file.actionable_actions {
            config.actionable_actions = actions.into_iter().collect();
        }
        if let Some(actors) = file.privileged_actors {
            config.privileged_actors = actors.into_iter().collect();
        }
        if let Some(projects) = file.projects {
            config.projects = projects
                .into_iter()
                .map(|(repository, code)| (repository, ProjectCode::new(&code)))
                .collect();
        }
        if let Some(labels) = file.labels {
            config.labels = labels
                .into_iter()
                .map(|(label, flag)| Ok((label, parse_flag(&flag)?)))
                .collect::<Result<_, ConfigError>>()?;
        }
        if let Some(postfixes) = file.postfixes {
            config.postfixes = postfixes
                .into_iter()
                .map(|(flag, postfix)| Ok((parse_flag(&flag)?, postfix)))
                .collect::<Result<_, ConfigError>>()?;
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ui_branch_prefix.is_empty() {
            return Err(ConfigError::EmptyBranchPrefix);
        }
        if self.postfixes.contains_key(&TestFlag::Restart) {
            return Err(ConfigError::RestartPostfix);
        }
        if let Some((label, flag)) = self
            .labels
            .iter()
            .find(|(_, flag)| !flag.is_restart() && !self.postfixes.contains_key(*flag))
        {
            return Err(ConfigError::MissingPostfix {
                label: label.clone(),
                flag: *flag,
            });
        }
        Ok(())
    }

    /// Base URL of the Bamboo plan API. Plan names are appended to it verbatim.
    pub fn bamboo_url(&self) -> &Url {
        &self.bamboo_url
    }

    pub fn ui_branch_prefix(&self) -> &str {
        &self.ui_branch_prefix
    }

    pub fn is_actionable(&self, action: &PullRequestAction) -> bool {
        self.actionable_actions.contains(action)
    }

    pub fn is_privileged(&self, login: &str) -> bool {
        self.privileged_actors.contains(login)
    }

    pub fn project_for(&self, repository: &str) -> Option<&ProjectCode> {
        self.projects.get(repository)
    }

    pub fn flag_for_label(&self, label: &str) -> Option<TestFlag> {
        self.labels.get(label).copied()
    }

    pub fn postfix_for(&self, flag: TestFlag) -> Option<&str> {
        self.postfixes.get(&flag).map(|postfix| postfix.as_str())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bamboo_url: Url::parse(DEFAULT_BAMBOO_URL).expect("Default Bamboo URL is valid"),
            ui_branch_prefix: DEFAULT_UI_BRANCH_PREFIX.to_string(),
            actionable_actions: DEFAULT_ACTIONABLE_ACTIONS
                .into_iter()
                .map(PullRequestAction::from)
                .collect(),
            privileged_actors: DEFAULT_PRIVILEGED_ACTORS
                .into_iter()
                .map(str::to_string)
                .collect(),
            projects: DEFAULT_PROJECTS
                .into_iter()
                .map(|(repository, code)| (repository.to_string(), ProjectCode::new(code)))
                .collect(),
            labels: DEFAULT_LABELS
                .into_iter()
                .map(|(label, flag)| (label.to_string(), flag))
                .collect(),
            postfixes: DEFAULT_POSTFIXES
                .into_iter()
                .map(|(flag, postfix)| (flag, postfix.to_string()))
                .collect(),
        }
    }
}

fn parse_flag(flag: &str) -> Result<TestFlag, ConfigError> {
    flag.parse().map_err(ConfigError::UnknownFlag)
}

fn parse_bamboo_url(url: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        url: url.to_string(),
        reason,
    };
    let parsed = Url::parse(url).map_err(|error| invalid(error.to_string()))?;
    if parsed.cannot_be_a_base() {
        return Err(invalid("URL cannot be a base".to_string()));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(invalid("URL cannot contain a query or fragment".to_string()));
    }
    Ok(parsed)
}
