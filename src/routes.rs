use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::{
    AppState,
    catalog::ListFilter,
    error::{AppError, AppResult},
    models::{BoxOffice, MovieCreate, MoviePage, RatingAggregate, RatingSubmit},
};

pub async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    q: Option<String>,
    year: Option<String>,
    genre: Option<String>,
    limit: Option<String>,
    cursor: Option<String>,
}

pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<MoviePage>> {
    let page = state
        .catalog
        .list_movies(ListFilter {
            query: params.q.filter(|s| !s.is_empty()),
            year: params.year.filter(|s| !s.is_empty()),
            genre: params.genre.filter(|s| !s.is_empty()),
            limit: effective_limit(params.limit.as_deref()),
            cursor: params.cursor.filter(|s| !s.is_empty()),
        })
        .await?;
    Ok(Json(page))
}

// Anything that does not parse as a positive integer falls back to 20.
fn effective_limit(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.parse::<u64>().ok()).filter(|v| *v > 0).unwrap_or(20)
}

pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<MovieCreate>,
) -> AppResult<Response> {
    require_bearer(&state.config.auth_token, &headers)?;
    payload.validate()?;

    // One synchronous enrichment attempt; anything but a clean hit leaves
    // the movie unenriched.
    let enrichment = match &state.boxoffice {
        Some(client) => match client.fetch(payload.title.trim()).await {
            Ok(found) => found.map(BoxOffice::from_upstream),
            Err(err) => {
                warn!(title = %payload.title, error = %err, "box office fetch failed, skipping enrichment");
                None
            },
        },
        None => None,
    };

    let movie = state.catalog.create_movie(payload, enrichment).await?;

    let location = format!("/movies/{}", movie.title);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(movie)).into_response())
}

pub async fn submit_rating(
    State(state): State<Arc<AppState>>,
    Path(title): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<RatingSubmit>,
) -> AppResult<Response> {
    let rater_id = require_rater(&headers)?;
    payload.validate()?;

    let title = title.trim();
    let (result, created) = state.catalog.submit_rating(title, &rater_id, payload.rating).await?;

    if created {
        let location = format!("/movies/{}/ratings/{}", result.movie_title, result.rater_id);
        Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(result)).into_response())
    } else {
        Ok((StatusCode::OK, Json(result)).into_response())
    }
}

pub async fn rating_aggregate(
    State(state): State<Arc<AppState>>,
    Path(title): Path<String>,
) -> AppResult<Json<RatingAggregate>> {
    let aggregate = state.catalog.rating_aggregate(title.trim()).await?;
    Ok(Json(aggregate))
}

fn require_bearer(auth_token: &str, headers: &HeaderMap) -> Result<(), AppError> {
    // No configured token means the guard is disabled (local/dev).
    if auth_token.is_empty() {
        return Ok(());
    }
    let raw = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).unwrap_or("");
    let token = raw.strip_prefix("Bearer ").map(str::trim).unwrap_or("");
    if token.is_empty() || token != auth_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn require_rater(headers: &HeaderMap) -> Result<String, AppError> {
    let rater =
        headers.get("X-Rater-Id").and_then(|v| v.to_str().ok()).unwrap_or("").trim().to_string();
    if rater.is_empty() {
        return Err(AppError::Unauthorized);
    }
    Ok(rater)
}
