//! The hub cache: fetched skill bundles under `<hub root>/<owner>/<repo>/<skill>`
//!
//! Bundles are fetched with a shallow clone into a scratch directory, then
//! copied into the cache. A repository with a `SKILL.md` at its root is a
//! single bundle named after the repository; otherwise every directory that
//! holds a `SKILL.md` is a bundle.

mod fetch;
mod layout;
mod lock;
mod repository;

pub use fetch::{Fetcher, GitFetcher};
pub use layout::{find_bundles, has_manifest, HubLayout, InstalledBundle};
pub use lock::{RepoLock, STALE_AFTER};
pub use repository::CacheRepository;
