//! Remote catalog feed

use async_trait::async_trait;
use std::time::Duration;

use super::CatalogKind;
use crate::config::HubConfig;
use crate::error::{HubError, Result};

/// Source of the raw catalog text
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Download the full text of one catalog
    async fn fetch(&self, kind: CatalogKind) -> Result<String>;
}

/// Plain HTTP GET of two static resources
pub struct HttpFeed {
    client: reqwest::Client,
    skills_url: String,
    repos_url: String,
}

impl HttpFeed {
    pub fn new(skills_url: impl Into<String>, repos_url: impl Into<String>) -> Result<Self> {
        let skills_url = skills_url.into();
        let client = reqwest::Client::builder()
            .user_agent(concat!("skill-hub/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| HubError::Http {
                url: skills_url.clone(),
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            skills_url,
            repos_url: repos_url.into(),
        })
    }

    pub fn from_config(config: &HubConfig) -> Result<Self> {
        Self::new(config.skills_url.clone(), config.repos_url.clone())
    }

    fn url(&self, kind: CatalogKind) -> &str {
        match kind {
            CatalogKind::Skills => &self.skills_url,
            CatalogKind::Repos => &self.repos_url,
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeed {
    async fn fetch(&self, kind: CatalogKind) -> Result<String> {
        let url = self.url(kind);
        let http_err = |message: String| HubError::Http {
            url: url.to_string(),
            message,
        };

        tracing::debug!("Downloading {} catalog from {}", kind, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| http_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(http_err(format!("HTTP {}", response.status())));
        }

        response.text().await.map_err(|e| http_err(e.to_string()))
    }
}
