use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, patch};
use axum::{Json, Router};
use uuid::Uuid;

use crate::database::{GameStatus, LibraryGame, NewLibraryGame, StorageError};
use crate::global::Global;
use crate::http::error::{ApiError, ApiErrorCode};

pub fn routes() -> Router<Arc<Global>> {
    Router::new()
        .route("/games", get(list_games).post(add_game))
        .route("/games/:id", delete(delete_game))
        .route("/games/:id/status", patch(update_status))
}

#[derive(Debug, serde::Deserialize)]
struct ListQuery {
    status: Option<GameStatus>,
}

#[derive(Debug, serde::Deserialize)]
struct StatusUpdate {
    status: GameStatus,
}

#[derive(serde::Serialize)]
struct DeleteResponse {
    success: bool,
}

/// POST /api/games
#[tracing::instrument(skip(global, game), fields(igdb_id = game.igdb_id))]
async fn add_game(
    State(global): State<Arc<Global>>,
    Json(game): Json<NewLibraryGame>,
) -> Result<Json<LibraryGame>, ApiError> {
    let game = global
        .storage
        .create_game(&global.config.api.default_user, game)
        .await?;

    Ok(Json(game))
}

/// GET /api/games?status=
#[tracing::instrument(skip(global))]
async fn list_games(
    State(global): State<Arc<Global>>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<LibraryGame>> {
    let user = &global.config.api.default_user;

    let games = match query.status {
        Some(status) => global.storage.get_user_games_by_status(user, status).await,
        None => global.storage.get_user_games(user).await,
    };

    Json(games)
}

/// PATCH /api/games/:id/status
#[tracing::instrument(skip(global))]
async fn update_status(
    State(global): State<Arc<Global>>,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<LibraryGame>, ApiError> {
    owned_game(&global, id).await?;
    let game = global.storage.update_game_status(id, update.status).await?;

    Ok(Json(game))
}

/// DELETE /api/games/:id
#[tracing::instrument(skip(global))]
async fn delete_game(
    State(global): State<Arc<Global>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    owned_game(&global, id).await?;

    if !global.storage.delete_game(id).await {
        return Err(StorageError::NotFound(id).into());
    }

    Ok(Json(DeleteResponse { success: true }))
}

async fn owned_game(global: &Global, id: Uuid) -> Result<LibraryGame, ApiError> {
    global
        .storage
        .get_game(id)
        .await
        .filter(|g| g.user_id == global.config.api.default_user)
        .ok_or_else(|| ApiError::not_found(ApiErrorCode::GAME_NOT_FOUND, "game not found"))
}
