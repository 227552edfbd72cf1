//! On-disk layout of the hub root
//!
//! ```text
//! <hub root>/
//! ├── <owner>/<repo>/<skill>/SKILL.md   ← bundle
//! ├── <owner>/<repo>/SKILL.md           ← legacy whole-repo bundle
//! ├── skill.list, repo.sort, *_custom.list
//! ├── config.yaml
//! └── .locks/
//! ```

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{HubError, Result};
use crate::target::{BundleId, RepoId, MANIFEST_FILE};

/// A bundle present in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBundle {
    pub id: BundleId,
    pub path: PathBuf,
    /// Stored as `<owner>/<repo>/SKILL.md` by older versions
    pub legacy: bool,
}

#[derive(Debug, Clone)]
pub struct HubLayout {
    root: PathBuf,
}

impl HubLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repo_dir(&self, repo: &RepoId) -> PathBuf {
        repo.dir_in(&self.root)
    }

    /// Canonical location `<owner>/<repo>/<skill>`
    pub fn bundle_dir(&self, bundle: &BundleId) -> PathBuf {
        self.repo_dir(&bundle.repo).join(&bundle.skill)
    }

    /// Where a bundle currently lives, if anywhere
    ///
    /// Falls back to the legacy `<owner>/<repo>/SKILL.md` layout when the
    /// skill is named after its repository.
    pub fn installed_path(&self, bundle: &BundleId) -> Option<PathBuf> {
        let dir = self.bundle_dir(bundle);
        if dir.exists() {
            return Some(dir);
        }

        let repo_dir = self.repo_dir(&bundle.repo);
        if bundle.is_repo_root() && has_manifest(&repo_dir) {
            return Some(repo_dir);
        }

        None
    }

    /// Bundles stored under one repository directory
    pub fn bundles_in_repo(&self, repo: &RepoId) -> Result<Vec<InstalledBundle>> {
        let repo_dir = self.repo_dir(repo);
        if !repo_dir.is_dir() {
            return Ok(Vec::new());
        }

        if has_manifest(&repo_dir) {
            return Ok(vec![InstalledBundle {
                id: BundleId::new(repo.name.clone(), repo.clone()),
                path: repo_dir,
                legacy: true,
            }]);
        }

        let mut bundles: Vec<InstalledBundle> = visible_dirs(&repo_dir)?
            .into_iter()
            .filter(|(_, path)| has_manifest(path))
            .map(|(skill, path)| InstalledBundle {
                id: BundleId::new(skill, repo.clone()),
                path,
                legacy: false,
            })
            .collect();
        bundles.sort_by(|a, b| a.id.skill.cmp(&b.id.skill));
        Ok(bundles)
    }

    /// Every installed bundle, sorted by `skill@owner/repo`
    pub fn list(&self) -> Result<Vec<InstalledBundle>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut bundles = Vec::new();
        for (owner, owner_dir) in visible_dirs(&self.root)? {
            for (name, _) in visible_dirs(&owner_dir)? {
                bundles.extend(self.bundles_in_repo(&RepoId::new(owner.clone(), name))?);
            }
        }

        bundles.sort_by_key(|b| b.id.to_string());
        Ok(bundles)
    }

    /// Remove the repository directory, then the owner directory, when empty
    pub fn prune_empty(&self, repo: &RepoId) {
        let repo_dir = self.repo_dir(repo);
        for dir in [repo_dir.as_path(), repo_dir.parent().unwrap_or(&self.root)] {
            if dir == self.root {
                break;
            }
            // remove_dir only succeeds on empty directories
            if std::fs::remove_dir(dir).is_ok() {
                tracing::debug!("Removed empty directory {}", dir.display());
            }
        }
    }
}

/// Directory directly holds a manifest
pub fn has_manifest(dir: &Path) -> bool {
    dir.join(MANIFEST_FILE).is_file()
}

/// Directories below `root` (excluding `root` and `.git`) that hold a
/// manifest, in file-name order
pub fn find_bundles(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir() && has_manifest(e.path()))
        .map(|e| e.into_path())
        .collect()
}

/// Immediate subdirectories, skipping dot-directories
fn visible_dirs(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = std::fs::read_dir(dir).map_err(|e| HubError::io(dir, e))?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| HubError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || !entry.path().is_dir() {
            continue;
        }
        dirs.push((name, entry.path()));
    }
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn bundle(root: &Path, rel: &str) {
        let dir = root.join(rel);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), "# skill\n").unwrap();
    }

    #[test]
    fn test_list_sorted_and_skips_dot_dirs() {
        let hub = TempDir::new().unwrap();
        bundle(hub.path(), "acme/tools/zeta");
        bundle(hub.path(), "acme/tools/alpha");
        bundle(hub.path(), "beta/kit/kit");
        bundle(hub.path(), ".locks/x/y");
        bundle(hub.path(), "acme/tools/.hidden");
        std::fs::write(hub.path().join("skill.list"), "x@y/z\n").unwrap();

        let names: Vec<String> = HubLayout::new(hub.path())
            .list()
            .unwrap()
            .iter()
            .map(|b| b.id.to_string())
            .collect();

        assert_eq!(
            names,
            vec!["alpha@acme/tools", "kit@beta/kit", "zeta@acme/tools"]
        );
    }

    #[test]
    fn test_legacy_layout_recognised() {
        let hub = TempDir::new().unwrap();
        bundle(hub.path(), "old/repo");
        bundle(hub.path(), "old/repo/nested");
        let layout = HubLayout::new(hub.path());

        let bundles = layout.list().unwrap();
        assert_eq!(bundles.len(), 1);
        assert!(bundles[0].legacy);
        assert_eq!(bundles[0].id.to_string(), "repo@old/repo");

        let id = BundleId::new("repo", RepoId::new("old", "repo"));
        assert_eq!(layout.installed_path(&id), Some(hub.path().join("old/repo")));
    }

    #[test]
    fn test_list_missing_root() {
        let layout = HubLayout::new("/definitely/not/a/hub");
        assert!(layout.list().unwrap().is_empty());
    }

    #[test]
    fn test_find_bundles_skips_git_and_root() {
        let checkout = TempDir::new().unwrap();
        bundle(checkout.path(), "");
        bundle(checkout.path(), "skills/pdf");
        bundle(checkout.path(), "skills/docx");
        bundle(checkout.path(), ".git/hooks");

        let found: Vec<PathBuf> = find_bundles(checkout.path())
            .into_iter()
            .map(|p| p.strip_prefix(checkout.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            found,
            vec![PathBuf::from("skills/docx"), PathBuf::from("skills/pdf")]
        );
    }

    #[test]
    fn test_prune_empty_stops_at_non_empty() {
        let hub = TempDir::new().unwrap();
        bundle(hub.path(), "acme/other/x");
        std::fs::create_dir_all(hub.path().join("acme/tools")).unwrap();

        let layout = HubLayout::new(hub.path());
        layout.prune_empty(&RepoId::new("acme", "tools"));

        assert!(!hub.path().join("acme/tools").exists());
        assert!(hub.path().join("acme/other/x").exists());
    }
}
