//! Services shared by every command

use anyhow::{Context, Result};
use std::path::PathBuf;

use skillhub_core::catalog::CatalogStore;
use skillhub_core::config::HubConfig;
use skillhub_core::hub::CacheRepository;
use skillhub_core::sync::SyncEngine;

pub struct HubContext {
    pub config: HubConfig,
    pub cache: CacheRepository,
    pub catalog: CatalogStore,
    pub sync: SyncEngine,
}

impl HubContext {
    pub fn load(hub_root: Option<PathBuf>) -> Result<Self> {
        let config = HubConfig::load(hub_root).context("Failed to load configuration")?;
        let catalog =
            CatalogStore::from_config(&config).context("Failed to set up catalog store")?;
        let sync = SyncEngine::from_config(&config).context("Failed to resolve tool paths")?;
        let cache = CacheRepository::from_config(&config);

        Ok(Self {
            config,
            cache,
            catalog,
            sync,
        })
    }
}
