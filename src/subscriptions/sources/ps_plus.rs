use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};

use super::{fetch_text, CatalogFetcher, FetchError, Provider};
use crate::subscriptions::catalog::CatalogEntry;

// Every catalog tile links to its store page under /game/.
static GAME_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/game/"]"#).expect("invalid game link selector"));

const MIN_TITLE_CHARS: usize = 3;

pub struct PsPlusFetcher {
    http: Client,
    url: String,
}

impl PsPlusFetcher {
    pub fn new(http: Client, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl CatalogFetcher for PsPlusFetcher {
    fn provider(&self) -> Provider {
        Provider::PsPlus
    }

    #[tracing::instrument(name = "ps_plus", skip(self))]
    async fn try_fetch(&self) -> Result<Vec<CatalogEntry>, FetchError> {
        let html = fetch_text(self.http.get(&self.url)).await?;
        Ok(parse_html(&html))
    }
}

pub fn parse_html(html: &str) -> Vec<CatalogEntry> {
    let document = Html::parse_document(html);

    document
        .select(&GAME_LINK_SELECTOR)
        .filter_map(|link| {
            let text = link.text().collect::<Vec<_>>().join(" ");
            let title = text.split_whitespace().collect::<Vec<_>>().join(" ");
            (title.chars().count() >= MIN_TITLE_CHARS).then(|| CatalogEntry::new(title))
        })
        .collect()
}
