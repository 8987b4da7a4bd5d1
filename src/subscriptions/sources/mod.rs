use std::sync::Arc;

use async_trait::async_trait;

use super::catalog::{dedup_entries, CatalogEntry};
use crate::config::ProvidersConfig;

pub mod game_pass;
pub mod geforce_now;
pub mod ps_plus;

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    GamePass,
    PsPlus,
    GeforceNow,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::GamePass, Provider::PsPlus, Provider::GeforceNow];

    pub fn slug(&self) -> &'static str {
        match self {
            Self::GamePass => "gamepass",
            Self::PsPlus => "psplus",
            Self::GeforceNow => "geforcenow",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::GamePass => "Xbox Game Pass",
            Self::PsPlus => "PlayStation Plus",
            Self::GeforceNow => "GeForce NOW",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed payload: {0}")]
    Parse(String),
}

/// Result of one catalog fetch. A provider outage shows up as `Degraded`
/// with an empty catalog instead of an error.
#[derive(Debug)]
pub enum FetchOutcome {
    Ok(Vec<CatalogEntry>),
    Degraded(FetchError),
}

impl FetchOutcome {
    pub fn entries(&self) -> &[CatalogEntry] {
        match self {
            Self::Ok(entries) => entries,
            Self::Degraded(_) => &[],
        }
    }

    pub fn into_entries(self) -> Vec<CatalogEntry> {
        match self {
            Self::Ok(entries) => entries,
            Self::Degraded(_) => Vec::new(),
        }
    }

    pub fn degraded_reason(&self) -> Option<&FetchError> {
        match self {
            Self::Ok(_) => None,
            Self::Degraded(e) => Some(e),
        }
    }
}

#[async_trait]
pub trait CatalogFetcher: Send + Sync {
    fn provider(&self) -> Provider;

    /// Provider-specific retrieval. Errors surface here and nowhere else.
    async fn try_fetch(&self) -> Result<Vec<CatalogEntry>, FetchError>;

    async fn fetch(&self) -> FetchOutcome {
        let provider = self.provider();

        match self.try_fetch().await {
            Ok(entries) => {
                let entries = dedup_entries(entries);
                tracing::info!(provider = provider.slug(), count = entries.len(), "fetched catalog");
                FetchOutcome::Ok(entries)
            }
            Err(e) => {
                tracing::warn!(provider = provider.slug(), error = %e, "catalog fetch degraded to empty");
                FetchOutcome::Degraded(e)
            }
        }
    }
}

/// Send a request and return the body, treating any non-2xx status as an error.
pub(crate) async fn fetch_text(request: reqwest::RequestBuilder) -> Result<String, FetchError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    Ok(response.text().await?)
}

#[derive(Clone)]
pub struct CatalogFetchers {
    pub game_pass: Arc<dyn CatalogFetcher>,
    pub ps_plus: Arc<dyn CatalogFetcher>,
    pub geforce_now: Arc<dyn CatalogFetcher>,
}

impl CatalogFetchers {
    pub fn from_config(http: &reqwest::Client, config: &ProvidersConfig) -> Self {
        Self {
            game_pass: Arc::new(game_pass::GamePassFetcher::new(http.clone(), config)),
            ps_plus: Arc::new(ps_plus::PsPlusFetcher::new(http.clone(), &config.ps_plus_url)),
            geforce_now: Arc::new(geforce_now::GeforceNowFetcher::new(
                http.clone(),
                &config.geforce_now_url,
            )),
        }
    }

    /// Run all three fetchers concurrently and wait for every one of them.
    #[tracing::instrument(name = "fetch_all", skip_all)]
    pub async fn fetch_all(&self) -> CatalogFetch {
        let (game_pass, ps_plus, geforce_now) = tokio::join!(
            self.game_pass.fetch(),
            self.ps_plus.fetch(),
            self.geforce_now.fetch(),
        );

        CatalogFetch {
            game_pass,
            ps_plus,
            geforce_now,
        }
    }
}

#[derive(Debug)]
pub struct CatalogFetch {
    pub game_pass: FetchOutcome,
    pub ps_plus: FetchOutcome,
    pub geforce_now: FetchOutcome,
}

impl CatalogFetch {
    pub fn outcome(&self, provider: Provider) -> &FetchOutcome {
        match provider {
            Provider::GamePass => &self.game_pass,
            Provider::PsPlus => &self.ps_plus,
            Provider::GeforceNow => &self.geforce_now,
        }
    }
}
