use std::sync::Arc;

use anyhow::Context as _;

use crate::config::Config;
use crate::database::MemStorage;
use crate::subscriptions::sources::CatalogFetchers;
use crate::subscriptions::title::AnchoredMatcher;
use crate::subscriptions::SubscriptionService;

pub struct Global {
    pub config: Config,
    pub storage: Arc<MemStorage>,
    pub subscriptions: SubscriptionService,
    pub started_at: std::time::Instant,
}

impl Global {
    pub fn init(config: Config) -> anyhow::Result<Arc<Self>> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.subscriptions.user_agent.as_str())
            .timeout(config.request_timeout())
            .build()
            .context("http client")?;

        tracing::info!(
            timeout_secs = config.subscriptions.request_timeout_secs,
            "built provider http client"
        );

        Ok(Self::with_client(config, http_client))
    }

    pub fn with_client(config: Config, http_client: reqwest::Client) -> Arc<Self> {
        let storage = Arc::new(MemStorage::new());
        let fetchers = CatalogFetchers::from_config(&http_client, &config.subscriptions.providers);
        let subscriptions = SubscriptionService::new(
            fetchers,
            storage.clone(),
            Arc::new(AnchoredMatcher),
            config.cache_ttl(),
        );

        Arc::new(Self {
            config,
            storage,
            subscriptions,
            started_at: std::time::Instant::now(),
        })
    }
}
