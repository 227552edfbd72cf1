//! Target parsing: `skill@owner/repo` and `owner/repo`

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{HubError, Result};

/// Manifest file that marks a directory as a skill bundle
pub const MANIFEST_FILE: &str = "SKILL.md";

static GITHUB_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://github\.com/([^/\s]+)/([^/\s]+)").expect("valid github url regex")
});

/// A GitHub repository identity (`owner/repo`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse strict `owner/repo` (exactly one `/`, both segments non-empty)
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = || HubError::InvalidRepo {
            input: input.to_string(),
        };

        if trimmed.contains("://") {
            return Err(invalid());
        }

        let mut parts = trimmed.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if valid_segment(owner) && valid_segment(name) => {
                Ok(Self::new(owner, name))
            }
            _ => Err(invalid()),
        }
    }

    /// Parse `owner/repo` or a GitHub URL such as
    /// `https://github.com/owner/repo/tree/main/skills`
    pub fn normalize(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if let Some(caps) = GITHUB_URL.captures(trimmed) {
            let owner = &caps[1];
            let name = caps[2].trim_end_matches(".git");
            if valid_segment(owner) && valid_segment(name) {
                return Ok(Self::new(owner, name));
            }
            return Err(HubError::InvalidRepo {
                input: input.to_string(),
            });
        }
        Self::parse(trimmed)
    }

    /// Clone URL under the given base (e.g. `https://github.com`)
    pub fn clone_url(&self, base: &str) -> String {
        format!("{}/{}/{}", base.trim_end_matches('/'), self.owner, self.name)
    }

    /// `<root>/<owner>/<repo>`
    pub fn dir_in(&self, root: &Path) -> PathBuf {
        root.join(&self.owner).join(&self.name)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoId {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A single bundle identity: `(owner, repo, skill)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BundleId {
    pub repo: RepoId,
    pub skill: String,
}

impl BundleId {
    pub fn new(skill: impl Into<String>, repo: RepoId) -> Self {
        Self {
            repo,
            skill: skill.into(),
        }
    }

    /// A bundle that is the whole repository (root manifest)
    pub fn is_repo_root(&self) -> bool {
        self.skill == self.repo.name
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.skill, self.repo)
    }
}

/// What an install/update/uninstall/sync call operates on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// `skill@owner/repo`
    Bundle(BundleId),
    /// `owner/repo`: every bundle found in the repository
    Repository(RepoId),
}

impl Target {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(HubError::InvalidTarget {
                input: input.to_string(),
            });
        }

        match trimmed.split_once('@') {
            Some((skill, repo)) => {
                if !valid_segment(skill) {
                    return Err(HubError::InvalidTarget {
                        input: input.to_string(),
                    });
                }
                Ok(Target::Bundle(BundleId::new(skill, RepoId::parse(repo)?)))
            }
            None => Ok(Target::Repository(RepoId::parse(trimmed)?)),
        }
    }

    pub fn repo(&self) -> &RepoId {
        match self {
            Target::Bundle(bundle) => &bundle.repo,
            Target::Repository(repo) => repo,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Bundle(bundle) => bundle.fmt(f),
            Target::Repository(repo) => repo.fmt(f),
        }
    }
}

impl FromStr for Target {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.chars().any(|c| c.is_whitespace() || c == '\\' || c == '/')
}

/// Read a newline-delimited target list; `#` comments and blank lines are skipped
pub fn read_target_file(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(HubError::TargetFileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| HubError::io(path, e))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
