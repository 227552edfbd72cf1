//! Structured results of hub and sync operations
//!
//! Operations never print. They return an [`OperationReport`] that the CLI
//! and the interactive browser format for display.

use std::fmt;
use std::path::PathBuf;

/// Why an operation left something untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Cache entry exists and force was not requested
    AlreadyInstalled,
    /// Tool directory already holds a manifest-bearing entry
    AlreadyLinked,
    /// Same skill name appeared twice in one repository
    DuplicateName,
}

impl SkipReason {
    /// Remediation hint shown next to the skip
    pub fn hint(&self) -> &'static str {
        match self {
            SkipReason::AlreadyInstalled => "already installed, use -u to reinstall",
            SkipReason::AlreadyLinked => "already present, use -f to overwrite",
            SkipReason::DuplicateName => "another bundle with this name was installed first",
        }
    }
}

/// Result for one bundle or link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Installed { path: PathBuf },
    Updated { path: PathBuf },
    Removed { path: PathBuf },
    Linked { link: PathBuf, source: PathBuf },
    Skipped(SkipReason),
    NotFound,
    Failed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Outcome::Installed { .. }
                | Outcome::Updated { .. }
                | Outcome::Removed { .. }
                | Outcome::Linked { .. }
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_) | Outcome::NotFound)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Installed { path } => write!(f, "installed -> {}", path.display()),
            Outcome::Updated { path } => write!(f, "updated -> {}", path.display()),
            Outcome::Removed { path } => write!(f, "removed {}", path.display()),
            Outcome::Linked { link, source } => {
                write!(f, "linked {} -> {}", link.display(), source.display())
            }
            Outcome::Skipped(reason) => write!(f, "skipped ({})", reason.hint()),
            Outcome::NotFound => write!(f, "not found"),
            Outcome::Failed(message) => write!(f, "failed: {message}"),
        }
    }
}

/// One line of a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    /// `skill@owner/repo`, `owner/repo` or a raw batch line
    pub label: String,
    pub outcome: Outcome,
}

/// Everything that happened during one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationReport {
    pub entries: Vec<ReportEntry>,
}

impl OperationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report holding a single entry
    pub fn single(label: impl Into<String>, outcome: Outcome) -> Self {
        let mut report = Self::new();
        report.push(label, outcome);
        report
    }

    pub fn push(&mut self, label: impl Into<String>, outcome: Outcome) {
        self.entries.push(ReportEntry {
            label: label.into(),
            outcome,
        });
    }

    /// Append all entries of another report
    pub fn merge(&mut self, other: OperationReport) {
        self.entries.extend(other.entries);
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| e.outcome.is_success())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, Outcome::Skipped(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| e.outcome.is_failure())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One-line summary, e.g. "2 succeeded, 1 skipped, 0 failed"
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} skipped, {} failed",
            self.succeeded().count(),
            self.skipped().count(),
            self.failures().count()
        )
    }
}
