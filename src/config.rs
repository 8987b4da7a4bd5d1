use std::env;
use std::net::SocketAddr;

use anyhow::Context as _;
use ::config::{Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub subscriptions: SubscriptionsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind: SocketAddr,
    /// Every library route acts on behalf of this user.
    pub default_user: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubscriptionsConfig {
    /// Enables the scheduled bulk refresh. Per-game lookups work either way.
    pub enabled: bool,
    /// Six-field cron expression (with seconds).
    pub refresh_cron: String,
    pub cache_ttl_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub game_pass_lists_url: String,
    pub game_pass_console_list: String,
    pub game_pass_pc_list: String,
    pub game_pass_products_url: String,
    pub game_pass_batch_size: usize,
    /// Product batches in flight at once.
    pub game_pass_batch_concurrency: usize,
    pub market: String,
    pub language: String,
    pub ps_plus_url: String,
    pub geforce_now_url: String,
}

fn default_level() -> String {
    "info".into()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            default_user: "default-user".into(),
        }
    }
}

impl Default for SubscriptionsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_cron: "0 0 */6 * * *".into(),
            cache_ttl_secs: 24 * 60 * 60,
            request_timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            game_pass_lists_url: "https://catalog.gamepass.com/sigls/v2".into(),
            game_pass_console_list: "f6f1f99f-9b49-4ccd-b3bf-4d9767a77f5e".into(),
            game_pass_pc_list: "fdd9e2a7-0fee-49f6-ad69-4354098401ff".into(),
            game_pass_products_url: "https://displaycatalog.mp.microsoft.com/v7.0/products".into(),
            game_pass_batch_size: 20,
            game_pass_batch_concurrency: 4,
            market: "US".into(),
            language: "en-us".into(),
            ps_plus_url: "https://psdeals.net/ca-store/collection/ps_plus_game_catalog".into(),
            geforce_now_url: "https://www.nvidia.com/en-us/geforce-now/games/".into(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: default_level(),
            api: ApiConfig::default(),
            subscriptions: SubscriptionsConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let environment = env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        let config_file = match environment.as_str() {
            "production" => "prod",
            _ => "dev",
        };

        ::config::Config::builder()
            .add_source(File::with_name("config/default.yaml").required(false))
            .add_source(File::with_name(&format!("config/{}.yaml", config_file)).required(false))
            .add_source(File::with_name("config/local.yaml").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()
            .context("failed to build config")?
            .try_deserialize()
            .context("failed to deserialize config")
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.subscriptions.cache_ttl_secs as i64)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.subscriptions.request_timeout_secs)
    }
}
