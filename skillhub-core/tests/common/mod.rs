//! Test helpers shared by the integration tests
//!
//! Repositories are served from a local "remotes" directory by
//! [`LocalFetcher`] and catalogs by [`StaticFeed`], so no test touches the
//! network or needs git.

#![allow(dead_code)]

use async_trait::async_trait;
use skillhub_core::catalog::{CatalogKind, CatalogStore, FeedSource};
use skillhub_core::hub::{CacheRepository, Fetcher};
use skillhub_core::sync::SyncEngine;
use skillhub_core::tools::{ToolRegistry, ToolTable};
use skillhub_core::{HubError, RepoId, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use tempfile::TempDir;
use walkdir::WalkDir;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Serves `<remotes>/<owner>/<repo>` as the checkout of `owner/repo`
pub struct LocalFetcher {
    remotes: PathBuf,
    calls: AtomicUsize,
}

impl LocalFetcher {
    pub fn new(remotes: &Path) -> Self {
        Self {
            remotes: remotes.to_path_buf(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for LocalFetcher {
    async fn fetch(&self, repo: &RepoId, dest: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let source = repo.dir_in(&self.remotes);
        if !source.is_dir() {
            return Err(HubError::Fetch {
                repo: repo.to_string(),
                stderr: format!("fatal: repository '{}' not found", repo),
            });
        }
        copy_tree(&source, dest).map_err(|e| HubError::io(dest, e))
    }
}

/// Fixed catalog text
pub struct StaticFeed {
    pub skills: String,
    pub repos: String,
}

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch(&self, kind: CatalogKind) -> Result<String> {
        Ok(match kind {
            CatalogKind::Skills => self.skills.clone(),
            CatalogKind::Repos => self.repos.clone(),
        })
    }
}

/// A hub root, project, home and remotes, each in its own temp dir
pub struct TestHub {
    pub hub: TempDir,
    pub remotes: TempDir,
    pub project: TempDir,
    pub home: TempDir,
    pub fetcher: Arc<LocalFetcher>,
    pub cache: CacheRepository,
    pub catalog: CatalogStore,
    pub sync: SyncEngine,
}

impl TestHub {
    pub fn new() -> Self {
        Self::with_catalog("", "")
    }

    pub fn with_catalog(skills: &str, repos: &str) -> Self {
        init_test_logging();

        let hub = TempDir::new().unwrap();
        let remotes = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();

        let fetcher = Arc::new(LocalFetcher::new(remotes.path()));
        let cache = CacheRepository::new(hub.path(), fetcher.clone());
        let catalog = CatalogStore::new(
            hub.path(),
            Arc::new(StaticFeed {
                skills: skills.to_string(),
                repos: repos.to_string(),
            }),
            Duration::from_secs(24 * 60 * 60),
        );
        let sync = SyncEngine::new(
            cache.layout().clone(),
            ToolRegistry::with_roots(
                ToolTable::default(),
                project.path().to_path_buf(),
                home.path().to_path_buf(),
            ),
        );

        Self {
            hub,
            remotes,
            project,
            home,
            fetcher,
            cache,
            catalog,
            sync,
        }
    }

    /// Put a `SKILL.md` at `<remotes>/<owner>/<repo>/<rel>` (rel may be empty)
    pub fn remote_bundle(&self, repo: &str, rel: &str, body: &str) -> PathBuf {
        let dir = self.remotes.path().join(repo).join(rel);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("SKILL.md"), body).unwrap();
        dir
    }

    /// Simulate git metadata in a remote repository
    pub fn remote_git_dir(&self, repo: &str) {
        let git = self.remotes.path().join(repo).join(".git");
        fs::create_dir_all(git.join("objects")).unwrap();
        fs::write(git.join("HEAD"), "ref: refs/heads/main\n").unwrap();
    }

    pub fn hub_path(&self, rel: &str) -> PathBuf {
        self.hub.path().join(rel)
    }

    /// Relative paths of every directory under the hub holding a SKILL.md
    pub fn cached_bundles(&self) -> Vec<String> {
        let mut found: Vec<String> = WalkDir::new(self.hub.path())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() == "SKILL.md")
            .filter_map(|e| {
                e.path()
                    .parent()?
                    .strip_prefix(self.hub.path())
                    .ok()
                    .map(|p| p.display().to_string())
            })
            .collect();
        found.sort();
        found
    }
}

impl TestHub {
    /// Relative path of every entry under the hub root
    pub fn hub_listing(&self) -> Vec<String> {
        let mut found: Vec<String> = WalkDir::new(self.hub.path())
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                e.path()
                    .strip_prefix(self.hub.path())
                    .ok()
                    .map(|p| p.display().to_string())
            })
            .collect();
        found.sort();
        found
    }
}

pub fn copy_tree(src: &Path, dest: &Path) -> std::io::Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
