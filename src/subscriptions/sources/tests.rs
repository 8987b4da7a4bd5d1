use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tracing_test::traced_test;

use super::*;
use crate::test_support::{http_client, serve, UNREACHABLE};

const CONSOLE_LIST: &str = "console-list";
const PC_LIST: &str = "pc-list";

const PS_PLUS_HTML: &str = r#"
<nav><a href="/ca-store/collection/ps_plus_game_catalog">PS Plus Catalog</a></nav>
<div class="game-collection">
  <a href="/ca-store/game/1/returnal"><span class="title">Returnal</span></a>
  <a href="/ca-store/game/2/ghost-of-tsushima">
    <span class="title">Ghost of
      Tsushima</span>
  </a>
  <a href="/ca-store/game/3/returnal"><span class="title">RETURNAL</span></a>
  <a href="/ca-store/game/4/xy"><span class="title">XY</span></a>
</div>
"#;

const GEFORCE_NOW_HTML: &str = r#"
<div class="games">
  <div class="game" data-game-name="Cyberpunk 2077"></div>
  <div class="game" data-game-name="Baldur&#39;s Gate 3"></div>
  <div class="game" data-game-name="  "></div>
  <div class="game" data-game-name="Cyberpunk 2077"></div>
  <div class="game">Not a game</div>
</div>
"#;

async fn sigls(Query(q): Query<HashMap<String, String>>) -> Response {
    let ids: &[&str] = match q.get("id").map(String::as_str) {
        Some(CONSOLE_LIST) => &["SF", "FH5", "NOTITLE"],
        Some(PC_LIST) => &["SF", "AOE4"],
        _ => return StatusCode::NOT_FOUND.into_response(),
    };

    let mut body = vec![json!({ "siglId": q["id"], "title": "All games" })];
    body.extend(ids.iter().map(|id| json!({ "id": id })));
    Json(body).into_response()
}

async fn products(Query(q): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
    let products: Vec<_> = q["bigIds"]
        .split(',')
        .map(|id| {
            let title = match id {
                "SF" => Some("Starfield"),
                "FH5" => Some("Forza Horizon 5"),
                "AOE4" => Some("Age of Empires IV: Anniversary Edition"),
                _ => None,
            };
            match title {
                Some(t) => json!({ "ProductId": id, "LocalizedProperties": [{ "ProductTitle": t }] }),
                None => json!({ "ProductId": id, "LocalizedProperties": [] }),
            }
        })
        .collect();

    Json(json!({ "Products": products }))
}

fn game_pass_router() -> Router {
    Router::new()
        .route("/sigls", get(sigls))
        .route("/products", get(products))
}

fn providers(base: &str) -> ProvidersConfig {
    ProvidersConfig {
        game_pass_lists_url: format!("{base}/sigls"),
        game_pass_console_list: CONSOLE_LIST.into(),
        game_pass_pc_list: PC_LIST.into(),
        game_pass_products_url: format!("{base}/products"),
        game_pass_batch_size: 2,
        ps_plus_url: format!("{base}/psplus"),
        geforce_now_url: format!("{base}/gfn"),
        ..Default::default()
    }
}

fn tags(tags: &[&str]) -> BTreeSet<String> {
    tags.iter().map(|t| t.to_string()).collect()
}

#[tokio::test]
#[traced_test]
async fn game_pass_merges_lists_and_looks_up_titles_in_batches() {
    let base = serve(game_pass_router()).await;
    let fetcher = game_pass::GamePassFetcher::new(http_client(), &providers(&base));

    let outcome = fetcher.fetch().await;
    let entries = outcome.entries();

    assert!(outcome.degraded_reason().is_none());
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].title, "Starfield");
    assert_eq!(entries[0].platform_tags, tags(&["console", "pc"]));
    assert_eq!(entries[1].title, "Forza Horizon 5");
    assert_eq!(entries[1].platform_tags, tags(&["console"]));
    assert_eq!(entries[2].title, "Age of Empires IV: Anniversary Edition");
    assert_eq!(entries[2].platform_tags, tags(&["pc"]));
}

#[tokio::test]
async fn game_pass_caps_product_batches_in_flight() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let slow_products = {
        let (in_flight, peak) = (in_flight.clone(), peak.clone());
        move |query: Query<HashMap<String, String>>| {
            let (in_flight, peak) = (in_flight.clone(), peak.clone());
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                products(query).await
            }
        }
    };
    let router = Router::new()
        .route("/sigls", get(sigls))
        .route("/products", get(slow_products));
    let base = serve(router).await;

    let config = ProvidersConfig {
        game_pass_batch_size: 1,
        game_pass_batch_concurrency: 2,
        ..providers(&base)
    };
    let fetcher = game_pass::GamePassFetcher::new(http_client(), &config);

    let outcome = fetcher.fetch().await;

    assert!(outcome.degraded_reason().is_none());
    assert_eq!(outcome.entries().len(), 3);
    assert_eq!(outcome.entries()[2].title, "Age of Empires IV: Anniversary Edition");
    let peak = peak.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "peak batches in flight: {peak}");
}

#[tokio::test]
#[traced_test]
async fn game_pass_degrades_when_a_list_fails() {
    let base = serve(game_pass_router()).await;
    let mut config = providers(&base);
    config.game_pass_pc_list = "missing".into();
    let fetcher = game_pass::GamePassFetcher::new(http_client(), &config);

    let outcome = fetcher.fetch().await;

    assert!(outcome.entries().is_empty());
    assert!(matches!(
        outcome.degraded_reason(),
        Some(FetchError::Status(s)) if *s == StatusCode::NOT_FOUND
    ));
    assert!(logs_contain("catalog fetch degraded to empty"));
}

#[tokio::test]
async fn game_pass_degrades_on_malformed_json() {
    let router = Router::new().route("/sigls", get(|| async { "<html>maintenance</html>" }));
    let base = serve(router).await;
    let fetcher = game_pass::GamePassFetcher::new(http_client(), &providers(&base));

    let outcome = fetcher.fetch().await;

    assert!(matches!(outcome, FetchOutcome::Degraded(FetchError::Parse(_))));
}

#[tokio::test]
async fn ps_plus_scrapes_and_dedupes_titles() {
    let router = Router::new().route("/psplus", get(|| async { Html(PS_PLUS_HTML) }));
    let base = serve(router).await;
    let config = providers(&base);
    let fetcher = ps_plus::PsPlusFetcher::new(http_client(), &config.ps_plus_url);

    let titles: Vec<String> = fetcher
        .fetch()
        .await
        .into_entries()
        .into_iter()
        .map(|e| e.title)
        .collect();

    assert_eq!(titles, vec!["Returnal", "Ghost of Tsushima"]);
}

#[test]
fn ps_plus_drops_short_titles() {
    let entries = ps_plus::parse_html(PS_PLUS_HTML);
    assert!(entries.iter().all(|e| e.title != "XY"));
}

#[tokio::test]
async fn geforce_now_reads_game_name_attributes() {
    let router = Router::new().route("/gfn", get(|| async { Html(GEFORCE_NOW_HTML) }));
    let base = serve(router).await;
    let config = providers(&base);
    let fetcher = geforce_now::GeforceNowFetcher::new(http_client(), &config.geforce_now_url);

    let titles: Vec<String> = fetcher
        .fetch()
        .await
        .into_entries()
        .into_iter()
        .map(|e| e.title)
        .collect();

    assert_eq!(titles, vec!["Cyberpunk 2077", "Baldur's Gate 3"]);
}

#[tokio::test]
async fn unreachable_provider_degrades_to_transport_error() {
    let fetcher = geforce_now::GeforceNowFetcher::new(http_client(), UNREACHABLE);

    let outcome = fetcher.fetch().await;

    assert!(outcome.entries().is_empty());
    assert!(matches!(outcome, FetchOutcome::Degraded(FetchError::Transport(_))));
}

#[tokio::test]
async fn slow_provider_times_out_and_degrades() {
    let router = Router::new().route(
        "/gfn",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Html(GEFORCE_NOW_HTML)
        }),
    );
    let base = serve(router).await;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let fetcher = geforce_now::GeforceNowFetcher::new(client, &format!("{base}/gfn"));

    let outcome = fetcher.fetch().await;

    assert!(matches!(
        outcome.degraded_reason(),
        Some(FetchError::Transport(e)) if e.is_timeout()
    ));
}

#[tokio::test]
#[traced_test]
async fn one_failing_provider_does_not_block_the_others() {
    let router = game_pass_router()
        .route("/psplus", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
        .route("/gfn", get(|| async { Html(GEFORCE_NOW_HTML) }));
    let base = serve(router).await;
    let fetchers = CatalogFetchers::from_config(&http_client(), &providers(&base));

    let fetch = fetchers.fetch_all().await;

    assert_eq!(fetch.outcome(Provider::GamePass).entries().len(), 3);
    assert_eq!(fetch.outcome(Provider::GeforceNow).entries().len(), 2);
    assert!(fetch.outcome(Provider::PsPlus).entries().is_empty());
    assert!(matches!(
        fetch.ps_plus.degraded_reason(),
        Some(FetchError::Status(s)) if *s == StatusCode::SERVICE_UNAVAILABLE
    ));
}

#[test]
fn sigl_list_skips_metadata_entry() {
    let ids = game_pass::parse_sigl_list(
        r#"[{"siglId":"abc","title":"Console","description":"x"},{"id":"A"},{"id":"B"}]"#,
    )
    .unwrap();

    assert_eq!(ids, vec!["A", "B"]);
}

#[test]
fn products_without_titles_are_skipped() {
    let products = game_pass::parse_products(
        r#"{"Products":[
            {"ProductId":"A","LocalizedProperties":[{"ProductTitle":" Hades "}]},
            {"ProductId":"B","LocalizedProperties":[]},
            {"ProductId":"C","LocalizedProperties":[{"ProductTitle":""}]}
        ]}"#,
    )
    .unwrap();

    assert_eq!(products, vec![("A".to_string(), "Hades".to_string())]);
}
