//! Repository fetching

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::config::HubConfig;
use crate::error::{HubError, Result};
use crate::target::RepoId;

/// Produces a working copy of a repository
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Materialize `repo` at `dest`, which does not exist yet
    async fn fetch(&self, repo: &RepoId, dest: &Path) -> Result<()>;
}

/// Shallow `git clone` bounded by a timeout
pub struct GitFetcher {
    base_url: String,
    timeout: Duration,
}

impl GitFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn from_config(config: &HubConfig) -> Self {
        Self::new(config.github_base.clone(), config.clone_timeout)
    }
}

#[async_trait]
impl Fetcher for GitFetcher {
    async fn fetch(&self, repo: &RepoId, dest: &Path) -> Result<()> {
        let url = repo.clone_url(&self.base_url);
        debug!("git clone --depth 1 {} -> {}", url, dest.display());

        let child = Command::new("git")
            .args(["clone", "--depth", "1", "--quiet"])
            .arg(&url)
            .arg(dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HubError::Fetch {
                repo: repo.to_string(),
                stderr: format!("failed to run git: {e}"),
            })?;

        // On timeout the child is dropped, and kill_on_drop terminates it
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| HubError::FetchTimeout {
                repo: repo.to_string(),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| HubError::Fetch {
                repo: repo.to_string(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(
                "git clone of {} exited with {}",
                repo,
                output.status.code().unwrap_or(-1)
            );
            return Err(HubError::Fetch {
                repo: repo.to_string(),
                stderr,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_clone_failure_reports_error() {
        let scratch = TempDir::new().unwrap();
        let missing = scratch.path().join("no-such-remote");
        let fetcher = GitFetcher::new(missing.display().to_string(), Duration::from_secs(30));

        let err = fetcher
            .fetch(&RepoId::new("acme", "tools"), &scratch.path().join("out"))
            .await
            .unwrap_err();

        assert!(matches!(err, HubError::Fetch { .. }), "got {err:?}");
        assert!(!scratch.path().join("out").join("SKILL.md").exists());
    }
}
