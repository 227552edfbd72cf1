//! Install, update and uninstall of cached bundles

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::layout::{find_bundles, has_manifest, HubLayout, InstalledBundle};
use super::lock::RepoLock;
use super::{Fetcher, GitFetcher};
use crate::catalog::CatalogStore;
use crate::config::HubConfig;
use crate::error::{HubError, Result};
use crate::report::{OperationReport, Outcome, SkipReason};
use crate::target::{read_target_file, BundleId, RepoId, Target};

/// Fetched repository in a scratch directory, deleted on drop
struct Checkout {
    _scratch: TempDir,
    root: PathBuf,
}

impl Checkout {
    fn has_root_manifest(&self) -> bool {
        has_manifest(&self.root)
    }

    /// Source directory for one bundle inside the checkout
    fn locate(&self, bundle: &BundleId, scanned: &[PathBuf]) -> Option<PathBuf> {
        if bundle.is_repo_root() && self.has_root_manifest() {
            return Some(self.root.clone());
        }
        scanned
            .iter()
            .find(|p| p.file_name().is_some_and(|n| n == bundle.skill.as_str()))
            .cloned()
    }
}

/// The local bundle cache under the hub root
pub struct CacheRepository {
    layout: HubLayout,
    fetcher: Arc<dyn Fetcher>,
}

impl CacheRepository {
    pub fn new(root: impl Into<PathBuf>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            layout: HubLayout::new(root),
            fetcher,
        }
    }

    /// Cache backed by `git clone` from the configured base URL
    pub fn from_config(config: &HubConfig) -> Self {
        Self::new(
            config.hub_root.clone(),
            Arc::new(GitFetcher::from_config(config)),
        )
    }

    pub fn layout(&self) -> &HubLayout {
        &self.layout
    }

    pub fn list(&self) -> Result<Vec<InstalledBundle>> {
        self.layout.list()
    }

    /// Install a bundle or every bundle of a repository
    ///
    /// Without `force` an existing cache entry is left alone and nothing is
    /// fetched. With `force` the entry is deleted before fetching.
    pub async fn install(&self, target: &Target, force: bool) -> Result<OperationReport> {
        let _lock = RepoLock::acquire(self.layout.root(), target.repo())?;
        match target {
            Target::Bundle(bundle) => self.install_bundle(bundle, force).await,
            Target::Repository(repo) => self.install_repository(repo, force).await,
        }
    }

    /// Reinstall a bundle, or the bundles the catalog lists for a repository
    pub async fn update(&self, target: &Target, catalog: &CatalogStore) -> Result<OperationReport> {
        match target {
            Target::Bundle(_) => self.install(target, true).await,
            Target::Repository(repo) => {
                let skills = catalog.skills_for_repo(repo).await?;
                let _lock = RepoLock::acquire(self.layout.root(), repo)?;
                self.update_repository(repo, skills).await
            }
        }
    }

    /// Delete a bundle or a whole repository subtree; links are left dangling
    pub async fn uninstall(&self, target: &Target) -> Result<OperationReport> {
        let label = match target {
            Target::Bundle(bundle) => bundle.to_string(),
            Target::Repository(repo) => repo.to_string(),
        };
        let not_found = || -> Result<OperationReport> {
            debug!("{} is not installed", label);
            Ok(OperationReport::single(label.clone(), Outcome::NotFound))
        };

        // Nothing on disk changes for a target that was never installed
        if self.uninstall_path(target).is_none() {
            return not_found();
        }

        let _lock = RepoLock::acquire(self.layout.root(), target.repo())?;
        let Some(path) = self.uninstall_path(target) else {
            return not_found();
        };

        remove_tree(&path)?;
        self.layout.prune_empty(target.repo());
        info!("Uninstalled {}", label);
        Ok(OperationReport::single(label, Outcome::Removed { path }))
    }

    fn uninstall_path(&self, target: &Target) -> Option<PathBuf> {
        match target {
            Target::Bundle(bundle) => self.layout.installed_path(bundle),
            Target::Repository(repo) => {
                let dir = self.layout.repo_dir(repo);
                dir.exists().then_some(dir)
            }
        }
    }

    /// Install each target listed in a file; failures never stop the batch
    pub async fn install_from_file(&self, path: &Path, force: bool) -> Result<OperationReport> {
        let mut report = OperationReport::new();
        for line in read_target_file(path)? {
            let result = match Target::parse(&line) {
                Ok(target) => self.install(&target, force).await,
                Err(e) => Err(e),
            };
            record(&mut report, line, result);
        }
        Ok(report)
    }

    /// Update each target listed in a file; failures never stop the batch
    pub async fn update_from_file(
        &self,
        path: &Path,
        catalog: &CatalogStore,
    ) -> Result<OperationReport> {
        let mut report = OperationReport::new();
        for line in read_target_file(path)? {
            let result = match Target::parse(&line) {
                Ok(target) => self.update(&target, catalog).await,
                Err(e) => Err(e),
            };
            record(&mut report, line, result);
        }
        Ok(report)
    }

    async fn install_bundle(&self, bundle: &BundleId, force: bool) -> Result<OperationReport> {
        let label = bundle.to_string();
        let replaced = match self.layout.installed_path(bundle) {
            Some(_) if !force => {
                debug!("{} already installed", label);
                return Ok(OperationReport::single(
                    label,
                    Outcome::Skipped(SkipReason::AlreadyInstalled),
                ));
            }
            Some(existing) => {
                remove_tree(&existing)?;
                true
            }
            None => false,
        };

        let checkout = self.checkout(&bundle.repo).await?;

        let scanned = if bundle.is_repo_root() && checkout.has_root_manifest() {
            Vec::new()
        } else {
            find_bundles(&checkout.root)
        };

        let Some(source) = checkout.locate(bundle, &scanned) else {
            self.layout.prune_empty(&bundle.repo);
            warn!("Skill {} not found in {}", bundle.skill, bundle.repo);
            return Ok(OperationReport::single(
                label,
                Outcome::Failed(format!(
                    "skill '{}' not found in {}",
                    bundle.skill, bundle.repo
                )),
            ));
        };

        let outcome = place_bundle(&label, &source, self.layout.bundle_dir(bundle), replaced);
        self.layout.prune_empty(&bundle.repo);
        Ok(OperationReport::single(label, outcome))
    }

    async fn install_repository(&self, repo: &RepoId, force: bool) -> Result<OperationReport> {
        let repo_dir = self.layout.repo_dir(repo);
        let replaced = repo_dir.exists();
        if replaced {
            if !force {
                debug!("{} already installed", repo);
                return Ok(OperationReport::single(
                    repo.to_string(),
                    Outcome::Skipped(SkipReason::AlreadyInstalled),
                ));
            }
            remove_tree(&repo_dir)?;
        }

        let checkout = self.checkout(repo).await?;
        let mut report = OperationReport::new();

        if checkout.has_root_manifest() {
            let bundle = BundleId::new(repo.name.clone(), repo.clone());
            let label = bundle.to_string();
            let outcome =
                place_bundle(&label, &checkout.root, self.layout.bundle_dir(&bundle), replaced);
            self.layout.prune_empty(repo);
            report.push(label, outcome);
            return Ok(report);
        }

        let mut seen = HashSet::new();
        for source in find_bundles(&checkout.root) {
            let Some(skill) = source.file_name().map(|n| n.to_string_lossy().to_string()) else {
                continue;
            };
            let bundle = BundleId::new(skill.clone(), repo.clone());

            if !seen.insert(skill) {
                warn!(
                    "Duplicate skill name {} in {}, skipping {}",
                    bundle.skill,
                    repo,
                    source.display()
                );
                report.push(
                    bundle.to_string(),
                    Outcome::Skipped(SkipReason::DuplicateName),
                );
                continue;
            }

            let label = bundle.to_string();
            let outcome = place_bundle(&label, &source, self.layout.bundle_dir(&bundle), replaced);
            report.push(label, outcome);
        }

        self.layout.prune_empty(repo);
        if report.is_empty() {
            report.push(
                repo.to_string(),
                Outcome::Failed(format!("no SKILL.md found in {repo}")),
            );
        }

        Ok(report)
    }

    async fn update_repository(&self, repo: &RepoId, skills: Vec<String>) -> Result<OperationReport> {
        if skills.is_empty() {
            return Ok(OperationReport::single(
                repo.to_string(),
                Outcome::Failed(format!("the skills catalog lists no skills for {repo}")),
            ));
        }

        let checkout = self.checkout(repo).await?;
        let scanned = find_bundles(&checkout.root);
        let mut report = OperationReport::new();

        for skill in skills {
            let bundle = BundleId::new(skill, repo.clone());
            let label = bundle.to_string();

            // The cached copy stays when the checkout no longer has the skill
            let Some(source) = checkout.locate(&bundle, &scanned) else {
                warn!("Skill {} not found in {}", bundle.skill, repo);
                report.push(
                    label,
                    Outcome::Failed(format!("skill '{}' not found in {}", bundle.skill, repo)),
                );
                continue;
            };

            let replaced = match self.layout.installed_path(&bundle) {
                Some(existing) => {
                    remove_tree(&existing)?;
                    true
                }
                None => false,
            };

            let outcome = place_bundle(&label, &source, self.layout.bundle_dir(&bundle), replaced);
            report.push(label, outcome);
        }

        self.layout.prune_empty(repo);
        Ok(report)
    }

    async fn checkout(&self, repo: &RepoId) -> Result<Checkout> {
        let scratch = tempfile::Builder::new()
            .prefix("skill-hub-")
            .tempdir()
            .map_err(|e| HubError::io(std::env::temp_dir(), e))?;
        let root = scratch.path().join(&repo.name);

        info!("Fetching {}", repo);
        if let Err(e) = self.fetcher.fetch(repo, &root).await {
            // A forced reinstall may already have emptied the repository dir
            self.layout.prune_empty(repo);
            return Err(e);
        }

        Ok(Checkout {
            _scratch: scratch,
            root,
        })
    }
}

/// Copy one bundle into the cache; a failed copy leaves no partial directory
fn place_bundle(label: &str, source: &Path, dest: PathBuf, replaced: bool) -> Outcome {
    if let Err(e) = copy_bundle(source, &dest) {
        warn!("Failed to copy {}: {}", label, e);
        if let Err(cleanup) = std::fs::remove_dir_all(&dest) {
            debug!("Failed to remove {}: {}", dest.display(), cleanup);
        }
        return Outcome::Failed(e.to_string());
    }

    info!("Installed {} -> {}", label, dest.display());
    if replaced {
        Outcome::Updated { path: dest }
    } else {
        Outcome::Installed { path: dest }
    }
}

fn record(report: &mut OperationReport, label: String, result: Result<OperationReport>) {
    match result {
        Ok(r) => report.merge(r),
        Err(e) => {
            warn!("{}: {}", label, e);
            report.push(label, Outcome::Failed(e.to_string()));
        }
    }
}

fn remove_tree(path: &Path) -> Result<()> {
    debug!("Removing {}", path.display());
    std::fs::remove_dir_all(path).map_err(|e| HubError::io(path, e))
}

/// Copy a bundle directory, leaving out any `.git` metadata
fn copy_bundle(src: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest).map_err(|e| HubError::io(dest, e))?;

    let walker = WalkDir::new(src)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            HubError::io(path, std::io::Error::from(e))
        })?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| HubError::io(&target, e))?;
        } else if file_type.is_file() {
            std::fs::copy(entry.path(), &target).map_err(|e| HubError::io(&target, e))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    let link = std::fs::read_link(src).map_err(|e| HubError::io(src, e))?;
    std::os::unix::fs::symlink(&link, dest).map_err(|e| HubError::io(dest, e))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, _dest: &Path) -> Result<()> {
    debug!("Skipping symlink {}", src.display());
    Ok(())
}
