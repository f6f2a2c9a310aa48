use crate::catalog::types::Catalog;
use reqwest::{Client, Error as ReqwestError, StatusCode};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] ReqwestError),
    #[error("catalog endpoint returned status {0}")]
    Status(StatusCode),
    #[error("catalog decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Where the playlist comes from.
///
/// Implementations are injected into the player service; the service treats
/// any error as "no catalog this round" and keeps running, so sources should
/// return errors rather than retry internally.
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    async fn load(&self) -> Result<Catalog, CatalogError>;
}

/// Catalog source backed by a plain JSON HTTP endpoint.
///
/// Accepts both response shapes the endpoint has served over time (bare
/// video array and `{ settings, videos }`), see [`Catalog`].
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    client: Client,
    endpoint: String,
}

impl HttpCatalogSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait::async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn load(&self) -> Result<Catalog, CatalogError> {
        debug!("Fetching catalog from {}", self.endpoint);

        let response = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status()));
        }

        let body = response.text().await?;
        let catalog: Catalog = serde_json::from_str(&body)?;

        debug!("Catalog fetched: {} videos", catalog.videos.len());
        Ok(catalog)
    }
}
