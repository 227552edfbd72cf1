//! Local catalog mirror
//!
//! Keeps `skill.list` and `repo.sort` under the hub root, refreshed from a
//! [`FeedSource`] once older than the TTL (24 hours by default). User-added
//! repositories live in `repo_custom.list` and are appended on every refresh.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::{CatalogEntry, CatalogKind, FeedSource, HttpFeed};
use crate::config::HubConfig;
use crate::error::{HubError, Result};
use crate::target::{RepoId, Target};

/// One page of search results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    /// Raw matching catalog lines for this page
    pub items: Vec<String>,
    /// Total matches across all pages
    pub total: usize,
    /// 1-indexed page number actually served
    pub page: usize,
    pub page_size: usize,
}

impl SearchPage {
    pub fn page_count(&self) -> usize {
        if self.total == 0 {
            1
        } else {
            self.total.div_ceil(self.page_size)
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count()
    }
}

/// Result of editing the custom repository list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomRepoChange {
    pub repo: RepoId,
    /// False when the repository was already present (add) or absent (remove)
    pub changed: bool,
    /// Set when the follow-up refresh of `repo.sort` failed
    pub refresh_error: Option<String>,
}

pub struct CatalogStore {
    root: PathBuf,
    feed: Arc<dyn FeedSource>,
    ttl: Duration,
}

impl CatalogStore {
    pub fn new(root: impl Into<PathBuf>, feed: Arc<dyn FeedSource>, ttl: Duration) -> Self {
        Self {
            root: root.into(),
            feed,
            ttl,
        }
    }

    /// Store backed by the HTTP feed named in the configuration
    pub fn from_config(config: &HubConfig) -> Result<Self> {
        let feed = HttpFeed::from_config(config)?;
        Ok(Self::new(
            config.hub_root.clone(),
            Arc::new(feed),
            config.catalog_ttl,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, kind: CatalogKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    fn custom_path(&self, kind: CatalogKind) -> PathBuf {
        self.root.join(kind.custom_file_name())
    }

    /// Missing, or last modified longer ago than the TTL
    pub fn is_stale(&self, kind: CatalogKind) -> bool {
        let modified = match std::fs::metadata(self.path(kind)).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => return true,
        };

        SystemTime::now()
            .duration_since(modified)
            .map(|age| age >= self.ttl)
            .unwrap_or(false)
    }

    /// Download a catalog and replace the local mirror
    ///
    /// The mirror is only written after a successful download, so a failed
    /// refresh leaves the previous file untouched. Returns the line count.
    pub async fn refresh(&self, kind: CatalogKind) -> Result<usize> {
        let remote = self.feed.fetch(kind).await?;

        let mut seen = HashSet::new();
        let mut lines = Vec::new();
        for line in remote.lines().map(|l| l.trim_end_matches('\r')) {
            if !line.trim().is_empty() {
                seen.insert(line.trim().to_string());
            }
            lines.push(line.to_string());
        }

        for custom in read_lines(&self.custom_path(kind))? {
            if seen.insert(custom.clone()) {
                lines.push(custom);
            }
        }

        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }

        let mut content = lines.join("\n");
        content.push('\n');
        self.write_atomic(&self.path(kind), &content)?;

        let count = lines.iter().filter(|l| !l.trim().is_empty()).count();
        info!("Refreshed {} catalog ({} entries)", kind, count);
        Ok(count)
    }

    /// Refresh when missing or stale
    ///
    /// A stale mirror whose refresh fails is kept and used as is; a missing
    /// mirror whose refresh fails is an error.
    pub async fn ensure_fresh(&self, kind: CatalogKind) -> Result<()> {
        let path = self.path(kind);
        if !path.exists() {
            debug!("No local {} catalog, downloading", kind);
            self.refresh(kind).await?;
            return Ok(());
        }

        if self.is_stale(kind) {
            debug!("Local {} catalog is stale, refreshing", kind);
            if let Err(e) = self.refresh(kind).await {
                warn!("Using stale {} catalog: {}", kind, e);
            }
        }

        Ok(())
    }

    /// Case-insensitive substring search over the local mirror
    ///
    /// Pages are 1-indexed; page 0 is treated as 1. A missing mirror yields
    /// an empty result.
    pub fn search(
        &self,
        kind: CatalogKind,
        query: &str,
        page: usize,
        page_size: usize,
    ) -> Result<SearchPage> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        // A whitespace-only query lists everything; any other query matches verbatim
        let match_all = query.trim().is_empty();
        let needle = query.to_lowercase();

        let matches: Vec<String> = read_lines(&self.path(kind))?
            .into_iter()
            .filter(|line| match_all || line.to_lowercase().contains(&needle))
            .collect();

        let total = matches.len();
        let items = matches
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();

        Ok(SearchPage {
            items,
            total,
            page,
            page_size,
        })
    }

    /// Parsed entries of the local mirror; unparseable lines are skipped
    pub fn entries(&self, kind: CatalogKind) -> Result<Vec<CatalogEntry>> {
        Ok(read_lines(&self.path(kind))?
            .iter()
            .filter_map(|line| match CatalogEntry::parse(line) {
                Ok(entry) => Some(entry),
                Err(_) => {
                    debug!("Skipping catalog line: {}", line);
                    None
                }
            })
            .collect())
    }

    /// Skill names the skills catalog lists for a repository
    pub async fn skills_for_repo(&self, repo: &RepoId) -> Result<Vec<String>> {
        self.ensure_fresh(CatalogKind::Skills).await?;

        let mut seen = HashSet::new();
        Ok(self
            .entries(CatalogKind::Skills)?
            .into_iter()
            .filter_map(|entry| match entry.target {
                Target::Bundle(bundle) if &bundle.repo == repo => Some(bundle.skill),
                _ => None,
            })
            .filter(|skill| seen.insert(skill.clone()))
            .collect())
    }

    /// Repositories the user added locally
    pub fn custom_repos(&self) -> Result<Vec<String>> {
        read_lines(&self.custom_path(CatalogKind::Repos))
    }

    /// Add a repository (`owner/repo` or GitHub URL) to the custom list
    pub async fn add_custom_repo(&self, input: &str) -> Result<CustomRepoChange> {
        let repo = RepoId::normalize(input)?;
        let key = repo.to_string();
        let mut repos = self.custom_repos()?;

        if repos.contains(&key) {
            debug!("{} is already in the custom list", key);
            return Ok(CustomRepoChange {
                repo,
                changed: false,
                refresh_error: None,
            });
        }

        repos.push(key);
        repos.sort();
        repos.dedup();
        self.write_custom_repos(&repos)?;
        info!("Added {} to custom repositories", repo);

        Ok(self.finish_custom_change(repo).await)
    }

    /// Remove a repository from the custom list
    pub async fn remove_custom_repo(&self, input: &str) -> Result<CustomRepoChange> {
        let repo = RepoId::normalize(input)?;
        let key = repo.to_string();
        let repos = self.custom_repos()?;

        if !repos.contains(&key) {
            return Ok(CustomRepoChange {
                repo,
                changed: false,
                refresh_error: None,
            });
        }

        let remaining: Vec<String> = repos.into_iter().filter(|r| r != &key).collect();
        self.write_custom_repos(&remaining)?;
        info!("Removed {} from custom repositories", repo);

        Ok(self.finish_custom_change(repo).await)
    }

    async fn finish_custom_change(&self, repo: RepoId) -> CustomRepoChange {
        let refresh_error = match self.refresh(CatalogKind::Repos).await {
            Ok(_) => None,
            Err(e) => {
                warn!("Custom list saved but repository catalog refresh failed: {}", e);
                Some(e.to_string())
            }
        };

        CustomRepoChange {
            repo,
            changed: true,
            refresh_error,
        }
    }

    fn write_custom_repos(&self, repos: &[String]) -> Result<()> {
        let mut content = repos.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        self.write_atomic(&self.custom_path(CatalogKind::Repos), &content)
    }

    fn write_atomic(&self, path: &Path, content: &str) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| HubError::io(&self.root, e))?;

        let mut tmp = NamedTempFile::new_in(&self.root).map_err(|e| HubError::io(&self.root, e))?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| HubError::io(tmp.path(), e))?;
        tmp.persist(path).map_err(|e| HubError::io(path, e.error))?;
        Ok(())
    }
}

/// Trimmed non-blank lines; a missing file reads as empty
fn read_lines(path: &Path) -> Result<Vec<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(HubError::io(path, e)),
    }
}
