//! Fetch all three subscription catalogs once and report what came back.
//!
//! Any extra arguments are treated as titles and matched against the result.

use game_tracker_api::config::Config;
use game_tracker_api::subscriptions::catalog::CatalogSnapshot;
use game_tracker_api::subscriptions::sources::{CatalogFetchers, Provider};
use game_tracker_api::subscriptions::title::AnchoredMatcher;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new("debug,hyper=info,reqwest=info,html5ever=info,selectors=info"))
        .with(fmt_layer)
        .init();

    let config = Config::load()?;
    let http_client = reqwest::Client::builder()
        .user_agent(config.subscriptions.user_agent.as_str())
        .timeout(config.request_timeout())
        .build()?;

    let fetchers = CatalogFetchers::from_config(&http_client, &config.subscriptions.providers);
    let fetch = fetchers.fetch_all().await;

    for provider in Provider::ALL {
        let outcome = fetch.outcome(provider);
        match outcome.degraded_reason() {
            Some(reason) => println!("{provider}: degraded ({reason})"),
            None => println!("{provider}: {} titles", outcome.entries().len()),
        }
    }

    let titles: Vec<String> = std::env::args().skip(1).collect();
    if titles.is_empty() {
        return Ok(());
    }

    let snapshot = CatalogSnapshot {
        game_pass: fetch.game_pass.into_entries(),
        ps_plus: fetch.ps_plus.into_entries(),
        geforce_now: fetch.geforce_now.into_entries(),
        last_updated: Some(chrono::Utc::now()),
    };

    for title in &titles {
        let flags = snapshot.compute_flags(title, &AnchoredMatcher);
        println!(
            "{title}: game pass console={} pc={}, ps plus={}, geforce now={}",
            flags.game_pass_console, flags.game_pass_pc, flags.ps_plus, flags.geforce_now
        );
    }

    Ok(())
}
