//! Linking cached bundles into assistant tool directories
//!
//! A sync places `<tool dir>/<skill>` as a symlink to the canonical cache
//! path. Entries that already hold a `SKILL.md` are left alone unless the
//! caller forces; anything else at that name (a stray file, a dangling
//! link) is replaced.

use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::HubConfig;
use crate::error::{HubError, Result};
use crate::hub::{has_manifest, HubLayout};
use crate::report::{OperationReport, Outcome, SkipReason};
use crate::target::{read_target_file, Target};
use crate::tools::{Scope, ToolRegistry};

/// An entry found in a tool's skill directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedSkill {
    pub name: String,
    pub scope: Scope,
    /// Path of the entry inside the tool directory
    pub path: PathBuf,
    /// Symlink destination; `None` for a plain directory
    pub target: Option<PathBuf>,
}

impl LinkedSkill {
    /// Symlink whose destination no longer exists
    pub fn is_dangling(&self) -> bool {
        self.target.is_some() && !self.path.exists()
    }
}

pub struct SyncEngine {
    layout: HubLayout,
    tools: ToolRegistry,
}

impl SyncEngine {
    pub fn new(layout: HubLayout, tools: ToolRegistry) -> Self {
        Self { layout, tools }
    }

    /// Engine for the current directory and home, with the configured tools
    pub fn from_config(config: &HubConfig) -> Result<Self> {
        Ok(Self::new(
            HubLayout::new(config.hub_root.clone()),
            ToolRegistry::from_env(config.tools.clone())?,
        ))
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Link a cached bundle, or every cached bundle of a repository, into a tool
    pub fn sync(
        &self,
        tool: &str,
        target: &Target,
        scope: Scope,
        force: bool,
    ) -> Result<OperationReport> {
        let dir = self.tools.scope_path(tool, scope)?;

        match target {
            Target::Bundle(bundle) => {
                let source = self
                    .layout
                    .installed_path(bundle)
                    .filter(|p| has_manifest(p))
                    .ok_or_else(|| HubError::SourceNotFound {
                        path: self.layout.bundle_dir(bundle),
                        target: bundle.to_string(),
                    })?;

                let outcome = link(&dir, &bundle.skill, &source, force)?;
                Ok(OperationReport::single(bundle.to_string(), outcome))
            }
            Target::Repository(repo) => {
                let bundles = self.layout.bundles_in_repo(repo)?;
                if bundles.is_empty() {
                    return Err(HubError::SourceNotFound {
                        path: self.layout.repo_dir(repo),
                        target: repo.to_string(),
                    });
                }

                let mut report = OperationReport::new();
                for bundle in bundles {
                    let outcome = link(&dir, &bundle.id.skill, &bundle.path, force)
                        .unwrap_or_else(|e| {
                            warn!("Failed to sync {}: {}", bundle.id, e);
                            Outcome::Failed(e.to_string())
                        });
                    report.push(bundle.id.to_string(), outcome);
                }
                Ok(report)
            }
        }
    }

    /// Sync every target listed in a file; failures never stop the batch
    pub fn sync_from_file(
        &self,
        tool: &str,
        path: &Path,
        scope: Scope,
        force: bool,
    ) -> Result<OperationReport> {
        // Unknown tool or scope fails the whole batch up front
        self.tools.scope_path(tool, scope)?;

        let mut report = OperationReport::new();
        for line in read_target_file(path)? {
            let result = Target::parse(&line).and_then(|t| self.sync(tool, &t, scope, force));
            match result {
                Ok(r) => report.merge(r),
                Err(e) => {
                    warn!("{}: {}", line, e);
                    report.push(line, Outcome::Failed(e.to_string()));
                }
            }
        }
        Ok(report)
    }

    /// Names that already occupy a manifest-bearing directory for this tool
    pub fn find_conflicting(
        &self,
        skill_names: &[String],
        tool: &str,
        scope: Scope,
    ) -> Result<Vec<String>> {
        let dir = self.tools.scope_path(tool, scope)?;
        Ok(skill_names
            .iter()
            .filter(|name| {
                let entry = dir.join(name);
                entry.is_dir() && has_manifest(&entry)
            })
            .cloned()
            .collect())
    }

    /// Entries of a tool's skill directory, sorted by name
    pub fn linked_skills(&self, tool: &str, scope: Scope) -> Result<Vec<LinkedSkill>> {
        let dir = self.tools.scope_path(tool, scope)?;
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HubError::io(&dir, e)),
        };

        let mut skills = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| HubError::io(&dir, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }

            let path = entry.path();
            let meta = std::fs::symlink_metadata(&path).map_err(|e| HubError::io(&path, e))?;
            let target = if meta.file_type().is_symlink() {
                std::fs::read_link(&path).ok()
            } else if meta.is_dir() {
                None
            } else {
                continue;
            };

            skills.push(LinkedSkill {
                name,
                scope,
                path,
                target,
            });
        }

        skills.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(skills)
    }

    /// Remove one entry from a tool's skill directory
    pub fn remove_link(&self, tool: &str, scope: Scope, skill: &str) -> Result<OperationReport> {
        let dir = self.tools.scope_path(tool, scope)?;
        let path = dir.join(skill);
        let label = format!("{skill} ({tool}, {scope})");

        match std::fs::symlink_metadata(&path) {
            Ok(meta) => {
                remove_entry(&path, &meta)?;
                info!("Removed {}", path.display());
                Ok(OperationReport::single(label, Outcome::Removed { path }))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Ok(OperationReport::single(label, Outcome::NotFound))
            }
            Err(e) => Err(HubError::io(&path, e)),
        }
    }
}

/// Place `<dir>/<name>` as a symlink to `source`
fn link(dir: &Path, name: &str, source: &Path, force: bool) -> Result<Outcome> {
    let entry = dir.join(name);
    let source = std::fs::canonicalize(source).map_err(|e| HubError::io(source, e))?;

    match std::fs::symlink_metadata(&entry) {
        Ok(meta) => {
            if !force && entry.is_dir() && has_manifest(&entry) {
                debug!("{} already present", entry.display());
                return Ok(Outcome::Skipped(SkipReason::AlreadyLinked));
            }
            remove_entry(&entry, &meta)?;
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(HubError::io(&entry, e)),
    }

    std::fs::create_dir_all(dir).map_err(|e| HubError::io(dir, e))?;
    symlink_dir(&source, &entry).map_err(|e| HubError::io(&entry, e))?;

    info!("Linked {} -> {}", entry.display(), source.display());
    Ok(Outcome::Linked {
        link: entry,
        source,
    })
}

fn remove_entry(path: &Path, meta: &Metadata) -> Result<()> {
    debug!("Removing {}", path.display());
    let result = if meta.file_type().is_symlink() {
        remove_symlink(path)
    } else if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    result.map_err(|e| HubError::io(path, e))
}

#[cfg(unix)]
fn symlink_dir(source: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, link)
}

#[cfg(windows)]
fn symlink_dir(source: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(source, link)
}

#[cfg(unix)]
fn remove_symlink(path: &Path) -> std::io::Result<()> {
    std::fs::remove_file(path)
}

// Directory symlinks on Windows are removed with remove_dir
#[cfg(windows)]
fn remove_symlink(path: &Path) -> std::io::Result<()> {
    std::fs::remove_dir(path).or_else(|_| std::fs::remove_file(path))
}
