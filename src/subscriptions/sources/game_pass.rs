use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::Deserialize;

use super::{fetch_text, CatalogFetcher, FetchError, Provider};
use crate::config::ProvidersConfig;
use crate::subscriptions::catalog::{CatalogEntry, CONSOLE_TAG, PC_TAG};

/// One element of a "sigls" list. The leading element only carries list
/// metadata (`siglId`, title) and has no `id`.
#[derive(Debug, Deserialize)]
struct SiglEntry {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProductsResponse {
    #[serde(default)]
    products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Product {
    product_id: String,
    #[serde(default)]
    localized_properties: Vec<LocalizedProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LocalizedProperties {
    product_title: Option<String>,
}

/// Two stages: product ids from the console and PC lists, then batched
/// title lookups against the product catalog.
pub struct GamePassFetcher {
    http: Client,
    lists_url: String,
    console_list: String,
    pc_list: String,
    products_url: String,
    batch_size: usize,
    batch_concurrency: usize,
    market: String,
    language: String,
}

impl GamePassFetcher {
    pub fn new(http: Client, config: &ProvidersConfig) -> Self {
        Self {
            http,
            lists_url: config.game_pass_lists_url.clone(),
            console_list: config.game_pass_console_list.clone(),
            pc_list: config.game_pass_pc_list.clone(),
            products_url: config.game_pass_products_url.clone(),
            batch_size: config.game_pass_batch_size.max(1),
            batch_concurrency: config.game_pass_batch_concurrency.max(1),
            market: config.market.clone(),
            language: config.language.clone(),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_list(&self, list_id: &str) -> Result<Vec<String>, FetchError> {
        let body = fetch_text(
            self.http
                .get(&self.lists_url)
                .header("Accept", "application/json")
                .query(&[
                    ("id", list_id),
                    ("language", self.language.as_str()),
                    ("market", self.market.as_str()),
                ]),
        )
        .await?;

        let ids = parse_sigl_list(&body)?;
        tracing::debug!(count = ids.len(), "fetched game pass list");
        Ok(ids)
    }

    #[tracing::instrument(skip(self, ids), fields(batch = ids.len()))]
    async fn fetch_titles(&self, ids: &[String]) -> Result<Vec<(String, String)>, FetchError> {
        let body = fetch_text(
            self.http
                .get(&self.products_url)
                .header("Accept", "application/json")
                .query(&[
                    ("bigIds", ids.join(",").as_str()),
                    ("market", self.market.as_str()),
                    ("languages", self.language.as_str()),
                ]),
        )
        .await?;

        parse_products(&body)
    }
}

#[async_trait]
impl CatalogFetcher for GamePassFetcher {
    fn provider(&self) -> Provider {
        Provider::GamePass
    }

    async fn try_fetch(&self) -> Result<Vec<CatalogEntry>, FetchError> {
        let (console, pc) = tokio::try_join!(
            self.fetch_list(&self.console_list),
            self.fetch_list(&self.pc_list),
        )?;

        let mut order: Vec<String> = Vec::new();
        let mut tags: HashMap<String, BTreeSet<String>> = HashMap::new();

        for (ids, tag) in [(console, CONSOLE_TAG), (pc, PC_TAG)] {
            for id in ids {
                let entry = tags.entry(id.clone()).or_insert_with(|| {
                    order.push(id);
                    BTreeSet::new()
                });
                entry.insert(tag.to_string());
            }
        }

        if order.is_empty() {
            return Ok(Vec::new());
        }

        let chunks: Vec<Vec<String>> = order.chunks(self.batch_size).map(<[String]>::to_vec).collect();
        let batches: Vec<Vec<(String, String)>> = stream::iter(chunks)
            .map(|ids: Vec<String>| async move { self.fetch_titles(&ids).await })
            .buffered(self.batch_concurrency)
            .try_collect()
            .await?;

        let mut titles: HashMap<String, String> = batches.into_iter().flatten().collect();

        let entries = order
            .into_iter()
            .filter_map(|id| {
                let title = titles.remove(&id)?;
                let platform_tags = tags.remove(&id).unwrap_or_default();
                Some(CatalogEntry { title, platform_tags })
            })
            .collect();

        Ok(entries)
    }
}

pub fn parse_sigl_list(body: &str) -> Result<Vec<String>, FetchError> {
    let entries: Vec<SiglEntry> =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    Ok(entries
        .into_iter()
        .filter_map(|e| e.id)
        .filter(|id| !id.is_empty())
        .collect())
}

/// `(product id, title)` pairs. Products without a localized title are skipped.
pub fn parse_products(body: &str) -> Result<Vec<(String, String)>, FetchError> {
    let response: ProductsResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    Ok(response
        .products
        .into_iter()
        .filter_map(|p| {
            let title = p
                .localized_properties
                .into_iter()
                .find_map(|l| l.product_title)
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())?;
            Some((p.product_id, title))
        })
        .collect())
}
