//! Catalog kinds and line parsing

use std::fmt;

use crate::error::Result;
use crate::target::Target;

/// The two catalogs mirrored under the hub root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    Skills,
    Repos,
}

impl CatalogKind {
    /// Local mirror file name
    pub fn file_name(&self) -> &'static str {
        match self {
            CatalogKind::Skills => "skill.list",
            CatalogKind::Repos => "repo.sort",
        }
    }

    /// User-maintained file merged into the mirror on refresh
    pub fn custom_file_name(&self) -> &'static str {
        match self {
            CatalogKind::Skills => "skill_custom.list",
            CatalogKind::Repos => "repo_custom.list",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogKind::Skills => f.write_str("skills"),
            CatalogKind::Repos => f.write_str("repositories"),
        }
    }
}

/// One catalog line: an installable target plus tab-separated metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub target: Target,
    pub metadata: Vec<String>,
}

impl CatalogEntry {
    pub fn parse(line: &str) -> Result<Self> {
        let mut fields = line.trim().split('\t');
        let id = fields.next().unwrap_or_default();
        let target = Target::parse(id)?;
        let metadata = fields
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self { target, metadata })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{BundleId, RepoId};

    #[test]
    fn test_parse_with_metadata() {
        let entry = CatalogEntry::parse("pdf@anthropics/skills\t1200\tPDF tools").unwrap();
        assert_eq!(
            entry.target,
            Target::Bundle(BundleId::new("pdf", RepoId::new("anthropics", "skills")))
        );
        assert_eq!(entry.metadata, vec!["1200", "PDF tools"]);
    }

    #[test]
    fn test_parse_bare_repo() {
        let entry = CatalogEntry::parse("acme/tools").unwrap();
        assert_eq!(entry.target, Target::Repository(RepoId::new("acme", "tools")));
        assert!(entry.metadata.is_empty());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(CatalogEntry::parse("not a target").is_err());
    }
}
