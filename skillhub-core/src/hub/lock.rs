//! Advisory per-repository lock files (`<hub>/.locks/<owner>__<repo>.lock`)
//!
//! Held for the duration of one install, update or uninstall so that two
//! processes never rewrite the same repository subtree at once.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use crate::error::{HubError, Result};
use crate::target::RepoId;

const LOCK_DIR: &str = ".locks";

/// Locks older than this are assumed to belong to a crashed process
pub const STALE_AFTER: Duration = Duration::from_secs(10 * 60);

/// Removed from disk when dropped
#[derive(Debug)]
pub struct RepoLock {
    path: PathBuf,
}

impl RepoLock {
    pub fn acquire(hub_root: &Path, repo: &RepoId) -> Result<Self> {
        let dir = hub_root.join(LOCK_DIR);
        std::fs::create_dir_all(&dir).map_err(|e| HubError::io(&dir, e))?;
        let path = dir.join(format!("{}__{}.lock", repo.owner, repo.name));

        match Self::create(&path) {
            Ok(lock) => Ok(lock),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if !is_stale(&path) {
                    return Err(HubError::Busy {
                        repo: repo.to_string(),
                        lock: path,
                    });
                }

                warn!("Removing stale lock {}", path.display());
                std::fs::remove_file(&path).map_err(|e| HubError::io(&path, e))?;
                Self::create(&path).map_err(|e| match e.kind() {
                    ErrorKind::AlreadyExists => HubError::Busy {
                        repo: repo.to_string(),
                        lock: path.clone(),
                    },
                    _ => HubError::io(&path, e),
                })
            }
            Err(e) => Err(HubError::io(&path, e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn create(path: &Path) -> std::io::Result<Self> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        writeln!(
            file,
            "pid {} at {}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        )?;
        debug!("Acquired {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!("Failed to remove lock {}: {}", self.path.display(), e);
        }
    }
}

fn is_stale(path: &Path) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .map(|age| age > STALE_AFTER)
        .unwrap_or(false)
}
