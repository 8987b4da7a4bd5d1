use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::global::Global;
use crate::http::error::{ApiError, ApiErrorCode};
use crate::subscriptions::catalog::SubscriptionFlags;
use crate::subscriptions::{RefreshSummary, ServiceStatus, SubscriptionError};

pub fn routes() -> Router<Arc<Global>> {
    Router::new()
        .route("/subscriptions/status", get(status))
        .route("/subscriptions/refresh", post(refresh))
        .route("/subscriptions/:igdb_id", get(game_subscriptions))
}

#[derive(Debug, serde::Deserialize)]
struct LookupQuery {
    title: Option<String>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct GameSubscriptionsResponse {
    igdb_id: i64,
    #[serde(flatten)]
    flags: SubscriptionFlags,
}

fn unavailable(e: SubscriptionError) -> ApiError {
    tracing::error!(error = %e, "subscription data unavailable");
    ApiError::service_unavailable(
        ApiErrorCode::SUBSCRIPTIONS_UNAVAILABLE,
        "subscription data unavailable",
    )
}

/// GET /api/subscriptions/:igdb_id?title=
///
/// Without `title`, the name stored in the user's library is used.
#[tracing::instrument(skip(global))]
async fn game_subscriptions(
    State(global): State<Arc<Global>>,
    Path(igdb_id): Path<i64>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<GameSubscriptionsResponse>, ApiError> {
    let title = match query.title.filter(|t| !t.trim().is_empty()) {
        Some(title) => title,
        None => global
            .storage
            .find_user_game_by_igdb_id(&global.config.api.default_user, igdb_id)
            .await
            .map(|g| g.name)
            .ok_or_else(|| {
                ApiError::bad_request(ApiErrorCode::MISSING_TITLE, "title is required")
            })?,
    };

    let flags = global
        .subscriptions
        .check_game_subscriptions_by_id(igdb_id, &title)
        .await
        .map_err(unavailable)?;

    Ok(Json(GameSubscriptionsResponse { igdb_id, flags }))
}

/// POST /api/subscriptions/refresh
#[tracing::instrument(skip(global))]
async fn refresh(State(global): State<Arc<Global>>) -> Result<Json<RefreshSummary>, ApiError> {
    let summary = global
        .subscriptions
        .update_subscription_data()
        .await
        .map_err(unavailable)?;

    Ok(Json(summary))
}

/// GET /api/subscriptions/status
#[tracing::instrument(skip(global))]
async fn status(State(global): State<Arc<Global>>) -> Json<ServiceStatus> {
    Json(global.subscriptions.status())
}
