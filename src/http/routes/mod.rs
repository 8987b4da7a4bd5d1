use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::global::Global;
use crate::subscriptions::sources::Provider;

pub mod games;
pub mod subscriptions;

pub fn routes() -> Router<Arc<Global>> {
    Router::new().route("/", get(root)).nest(
        "/api",
        Router::new()
            .merge(games::routes())
            .merge(subscriptions::routes()),
    )
}

#[derive(serde::Serialize)]
struct RootResponse {
    message: &'static str,
    version: &'static str,
    uptime: u64,
    providers: Vec<&'static str>,
}

#[tracing::instrument(skip(global))]
async fn root(State(global): State<Arc<Global>>) -> Json<RootResponse> {
    Json(RootResponse {
        message: "Game Tracker API",
        version: env!("CARGO_PKG_VERSION"),
        uptime: global.started_at.elapsed().as_secs(),
        providers: Provider::ALL.iter().map(|p| p.display_name()).collect(),
    })
}
