use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{Days, Utc};
use rd_core::ArticleQuery;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::state::ADMIN_SCRAPE_MAX_ARTICLES;
use crate::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    days: Option<u64>,
    limit: Option<usize>,
}

fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "success": false, "error": error, "message": message.into() })),
    )
        .into_response()
}

fn internal_error(context: &str, e: rd_core::Error) -> Response {
    warn!(error = %e, "{}", context);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, context, e.to_string())
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "timestamp": Utc::now() }))
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ArticleQuery>,
) -> Response {
    match state.store.list_articles(&query).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => internal_error("Failed to list articles", e),
    }
}

pub async fn get_article(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Response {
    match state.store.get_article(id).await {
        Ok(Some(detail)) => Json(detail).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            "Not Found",
            format!("Article {} not found", id),
        ),
        Err(e) => internal_error("Failed to load article", e),
    }
}

pub async fn list_categories(State(state): State<Arc<AppState>>) -> Response {
    match state.store.category_counts().await {
        Ok(categories) => Json(categories).into_response(),
        Err(e) => internal_error("Failed to load categories", e),
    }
}

pub async fn list_sources(State(state): State<Arc<AppState>>) -> Response {
    match state.store.source_counts().await {
        Ok(sources) => Json(sources).into_response(),
        Err(e) => internal_error("Failed to load sources", e),
    }
}

pub async fn trending(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TrendingQuery>,
) -> Response {
    let days = params.days.unwrap_or(7).min(365);
    let limit = params.limit.unwrap_or(10).clamp(1, 100);
    let today = Utc::now().date_naive();
    let since = today.checked_sub_days(Days::new(days)).unwrap_or(today);

    match state.store.trending_topics(since, limit).await {
        Ok(topics) => Json(topics).into_response(),
        Err(e) => internal_error("Failed to load trending topics", e),
    }
}

fn check_api_key(headers: &HeaderMap, expected: Option<&str>) -> Result<(), Response> {
    let Some(expected) = expected.filter(|k| !k.is_empty()) else {
        return Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server configuration error",
            "Admin API key not configured",
        ));
    };
    match headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        Some(given) if given == expected => Ok(()),
        _ => Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "Invalid or missing API key",
        )),
    }
}

pub async fn admin_scrape(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Err(response) = check_api_key(&headers, state.admin_api_key.as_deref()) {
        return response;
    }
    let report = state.manager.run_all(ADMIN_SCRAPE_MAX_ARTICLES).await;
    Json(json!({ "success": true, "results": report })).into_response()
}
