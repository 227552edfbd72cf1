//! Skill Hub configuration
//!
//! ## Resolution order
//!
//! Hub root:
//! 1. `--hub-root` CLI override
//! 2. `SKILL_HUB_HOME` environment variable
//! 3. `~/.skill-hub`
//!
//! Settings are then read from `<hub root>/config.yaml` when present, and
//! finally `SKILL_HUB_SKILLS_URL` / `SKILL_HUB_REPOS_URL` override the
//! catalog feed locations.
//!
//! ```yaml
//! skills_url: https://example.com/skill.list
//! repos_url: https://example.com/repo.sort
//! catalog_ttl_hours: 24
//! clone_timeout_secs: 60
//! tools:
//!   - name: MyAgent
//!     project: .myagent/skills
//!     global: ~/.myagent/skills
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::tools::{ToolSpec, ToolTable};

/// Environment variable overriding the hub root
pub const HUB_HOME_ENV: &str = "SKILL_HUB_HOME";
/// Environment variable overriding the skills feed URL
pub const SKILLS_URL_ENV: &str = "SKILL_HUB_SKILLS_URL";
/// Environment variable overriding the repositories feed URL
pub const REPOS_URL_ENV: &str = "SKILL_HUB_REPOS_URL";

/// Default skills catalog feed
pub const DEFAULT_SKILLS_URL: &str = "https://skill-hub.oss-cn-shanghai.aliyuncs.com/skill.list";
/// Default repositories catalog feed
pub const DEFAULT_REPOS_URL: &str = "https://skill-hub.oss-cn-shanghai.aliyuncs.com/repo.sort";

const CONFIG_FILE: &str = "config.yaml";
const HUB_DIR_NAME: &str = ".skill-hub";

fn default_skills_url() -> String {
    DEFAULT_SKILLS_URL.to_string()
}

fn default_repos_url() -> String {
    DEFAULT_REPOS_URL.to_string()
}

fn default_ttl_hours() -> u64 {
    24
}

fn default_clone_timeout() -> u64 {
    60
}

fn default_github_base() -> String {
    "https://github.com".to_string()
}

fn default_page_size() -> usize {
    50
}

/// Contents of `config.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default = "default_skills_url")]
    pub skills_url: String,

    #[serde(default = "default_repos_url")]
    pub repos_url: String,

    /// Catalog mirrors older than this are refreshed
    #[serde(default = "default_ttl_hours")]
    pub catalog_ttl_hours: u64,

    /// Upper bound for one `git clone`
    #[serde(default = "default_clone_timeout")]
    pub clone_timeout_secs: u64,

    /// Base URL repositories are cloned from
    #[serde(default = "default_github_base")]
    pub github_base: String,

    /// Rows per page in search results
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Extra tools, or overrides of built-in ones by name
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            skills_url: default_skills_url(),
            repos_url: default_repos_url(),
            catalog_ttl_hours: default_ttl_hours(),
            clone_timeout_secs: default_clone_timeout(),
            github_base: default_github_base(),
            page_size: default_page_size(),
            tools: Vec::new(),
        }
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Cache root holding `<owner>/<repo>/<skill>` and the catalog mirrors
    pub hub_root: PathBuf,
    pub skills_url: String,
    pub repos_url: String,
    pub catalog_ttl: Duration,
    pub clone_timeout: Duration,
    pub github_base: String,
    pub page_size: usize,
    pub tools: ToolTable,
}

impl HubConfig {
    /// Discover configuration from CLI override, environment and config file
    pub fn load(hub_root_override: Option<PathBuf>) -> Result<Self> {
        let hub_root = match hub_root_override {
            Some(root) => root,
            None => match std::env::var_os(HUB_HOME_ENV) {
                Some(root) if !root.is_empty() => PathBuf::from(root),
                _ => dirs::home_dir()
                    .context("Could not determine home directory")?
                    .join(HUB_DIR_NAME),
            },
        };

        let mut config = Self::load_from_root(hub_root)?;

        if let Ok(url) = std::env::var(SKILLS_URL_ENV) {
            debug!("Using {} override: {}", SKILLS_URL_ENV, url);
            config.skills_url = url;
        }
        if let Ok(url) = std::env::var(REPOS_URL_ENV) {
            debug!("Using {} override: {}", REPOS_URL_ENV, url);
            config.repos_url = url;
        }

        Ok(config)
    }

    /// Load `config.yaml` under a hub root (defaults when absent), no env lookups
    pub fn load_from_root(hub_root: PathBuf) -> Result<Self> {
        let settings_path = hub_root.join(CONFIG_FILE);
        let settings = if settings_path.exists() {
            SettingsFile::from_file(&settings_path)?
        } else {
            SettingsFile::default()
        };

        debug!("Hub root: {}", hub_root.display());
        Ok(Self::from_settings(hub_root, settings))
    }

    pub fn from_settings(hub_root: PathBuf, settings: SettingsFile) -> Self {
        let mut tools = ToolTable::default();
        tools.extend(settings.tools);

        Self {
            hub_root,
            skills_url: settings.skills_url,
            repos_url: settings.repos_url,
            catalog_ttl: Duration::from_secs(settings.catalog_ttl_hours.saturating_mul(60 * 60)),
            clone_timeout: Duration::from_secs(settings.clone_timeout_secs),
            github_base: settings.github_base,
            page_size: settings.page_size.max(1),
            tools,
        }
    }
}

impl SettingsFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(content)?)
    }
}
