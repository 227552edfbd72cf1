//! Skill Hub error types with clear, actionable messages

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by hub, catalog and sync operations
///
/// Conflicts ("already installed") are not errors; they surface as
/// [`crate::report::Outcome::Skipped`] entries in an operation report.
#[derive(Error, Debug)]
pub enum HubError {
    /// Repository identifier is not `owner/repo` (or a GitHub URL)
    #[error("Invalid repository '{input}': expected owner/repo or https://github.com/owner/repo")]
    InvalidRepo { input: String },

    /// Target is neither `skill@owner/repo` nor `owner/repo`
    #[error("Invalid target '{input}': expected skill@owner/repo or owner/repo")]
    InvalidTarget { input: String },

    /// A batch file named on the command line does not exist
    #[error("Target file not found: {path}")]
    TargetFileNotFound { path: PathBuf },

    /// Tool name is not in the tool table
    #[error("Unknown tool '{name}'. Run `skill-hub tools` to list known tools")]
    UnknownTool { name: String },

    /// Tool has no directory configured for the requested scope
    #[error("Tool '{tool}' has no {scope} skill directory configured")]
    ScopeNotConfigured { tool: String, scope: String },

    /// Bundle to sync is not in the hub cache
    #[error("Source not found: {path}\n\nInstall it first with:\n  skill-hub install {target}")]
    SourceNotFound { path: PathBuf, target: String },

    /// `git clone` exited with a non-zero status
    #[error("Failed to clone {repo}: {stderr}")]
    Fetch { repo: String, stderr: String },

    /// `git clone` exceeded the configured timeout
    #[error("Cloning {repo} timed out after {seconds}s")]
    FetchTimeout { repo: String, seconds: u64 },

    /// Catalog feed could not be downloaded
    #[error("Failed to download catalog from {url}: {message}")]
    Http { url: String, message: String },

    /// Another process holds the advisory lock for this repository
    #[error("Repository {repo} is busy (locked by another skill-hub process, lock file: {lock})")]
    Busy { repo: String, lock: PathBuf },

    /// Filesystem failure with the offending path
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HubError {
    /// Wrap an I/O error with the path it happened at
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HubError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for malformed user input (nothing was touched)
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            HubError::InvalidRepo { .. }
                | HubError::InvalidTarget { .. }
                | HubError::TargetFileNotFound { .. }
                | HubError::UnknownTool { .. }
                | HubError::ScopeNotConfigured { .. }
        )
    }
}

pub type Result<T, E = HubError> = std::result::Result<T, E>;
