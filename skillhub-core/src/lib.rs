//! Skill Hub library exports
//!
//! Catalog discovery, the local bundle cache and tool-directory syncing for
//! `SKILL.md` skill bundles.

pub mod catalog;
pub mod config;
pub mod error;
pub mod hub;
pub mod report;
pub mod sync;
pub mod target;
pub mod tools;

pub use error::{HubError, Result};
pub use report::{OperationReport, Outcome, SkipReason};
pub use target::{BundleId, RepoId, Target};
