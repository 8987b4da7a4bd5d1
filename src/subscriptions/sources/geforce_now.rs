use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};

use super::{fetch_text, CatalogFetcher, FetchError, Provider};
use crate::subscriptions::catalog::CatalogEntry;

const GAME_NAME_ATTR: &str = "data-game-name";

static GAME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[data-game-name]").expect("invalid game selector"));

pub struct GeforceNowFetcher {
    http: Client,
    url: String,
}

impl GeforceNowFetcher {
    pub fn new(http: Client, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl CatalogFetcher for GeforceNowFetcher {
    fn provider(&self) -> Provider {
        Provider::GeforceNow
    }

    #[tracing::instrument(name = "geforce_now", skip(self))]
    async fn try_fetch(&self) -> Result<Vec<CatalogEntry>, FetchError> {
        let html = fetch_text(self.http.get(&self.url)).await?;
        Ok(parse_html(&html))
    }
}

pub fn parse_html(html: &str) -> Vec<CatalogEntry> {
    let document = Html::parse_document(html);

    document
        .select(&GAME_SELECTOR)
        .filter_map(|element| element.value().attr(GAME_NAME_ATTR))
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(CatalogEntry::new)
        .collect()
}
