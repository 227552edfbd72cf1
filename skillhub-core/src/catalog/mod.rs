//! Skill Hub Catalog - skill and repository discovery
//!
//! The catalog is advisory discovery data. Installing a bundle never
//! requires it to be listed here.
//!
//! # Architecture
//!
//! ```text
//! Catalog feed (HTTP)
//!     │
//!     ├── skill.list   ← one `skill@owner/repo[\tmeta...]` per line
//!     └── repo.sort    ← one `owner/repo[\tmeta...]` per line
//!            │
//!            ▼  refresh (+ *_custom.list appended)
//!     <hub root>/skill.list, <hub root>/repo.sort
//!            │
//!            ▼
//!     search / skills_for_repo
//! ```

mod entry;
mod feed;
mod store;

pub use entry::{CatalogEntry, CatalogKind};
pub use feed::{FeedSource, HttpFeed};
pub use store::{CatalogStore, CustomRepoChange, SearchPage};
