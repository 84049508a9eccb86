use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;
use tracing::debug;

use crate::models::Game;
use crate::services::MetadataRequest;

use super::{ApiError, ApiResponse, AppState, SearchRequest};

pub async fn get_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Game>>, ApiError> {
    if id == 0 {
        return Ok(Json(ApiResponse::error("No ID specified.")));
    }

    match state.metadata().get_game(id).await? {
        Some(game) => Ok(Json(ApiResponse::success(game))),
        None => Ok(Json(ApiResponse::error("Game not found."))),
    }
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    request: Option<Json<SearchRequest>>,
) -> Result<Json<ApiResponse<Vec<Game>>>, ApiError> {
    let Some(Json(request)) = request else {
        return Ok(Json(ApiResponse::error("Missing search data.")));
    };

    let term = request.search_term.unwrap_or_default();
    if term.trim().is_empty() {
        return Ok(Json(ApiResponse::error("No search term")));
    }

    let games = state.metadata().search(&term).await?;
    debug!(term, results = games.len(), "Search served");
    Ok(Json(ApiResponse::success(games)))
}

pub async fn get_metadata(
    State(state): State<Arc<AppState>>,
    request: Option<Json<MetadataRequest>>,
) -> Result<Json<ApiResponse<Game>>, ApiError> {
    let Some(Json(request)) = request else {
        return Ok(Json(ApiResponse::error("Missing metadata data.")));
    };

    match state.metadata().get_metadata(&request).await? {
        Some(game) => Ok(Json(ApiResponse::success(game))),
        None => Ok(Json(ApiResponse::null())),
    }
}
