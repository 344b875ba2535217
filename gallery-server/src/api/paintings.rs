//! Public catalog API

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use shared::error::{AppError, ErrorCode};

use crate::db::paintings::{self, Painting, PaintingFilter};
use crate::error::ServiceError;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 12;
const MAX_PAGE_SIZE: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/paintings", get(list))
        .route("/api/paintings/featured", get(featured))
        .route("/api/paintings/{id}", get(get_by_id))
        .route("/api/artists", get(artists))
}

/// Query params for the gallery listing
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub artist: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// List available paintings with filters
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Painting>>, ServiceError> {
    let per_page = query
        .per_page
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let page = query.page.unwrap_or(1).max(1);

    let filter = PaintingFilter {
        artist: query.artist,
        min_price: query.min_price,
        max_price: query.max_price,
        search: query.search,
        sort_by: query.sort_by,
        sort_desc: !matches!(query.sort_order.as_deref(), Some("asc")),
        limit: per_page,
        offset: (page - 1) * per_page,
    };

    let result = paintings::list_available(&state.pool, &filter).await?;
    Ok(Json(result))
}

/// Featured paintings for the home page
async fn featured(State(state): State<AppState>) -> Result<Json<Vec<Painting>>, ServiceError> {
    Ok(Json(paintings::list_featured(&state.pool).await?))
}

/// Single painting details
async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Painting>, ServiceError> {
    let painting = paintings::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| {
            AppError::with_message(ErrorCode::PaintingNotFound, format!("Painting {id} not found"))
        })?;
    Ok(Json(painting))
}

/// Distinct artist names
async fn artists(State(state): State<AppState>) -> Result<Json<Vec<String>>, ServiceError> {
    Ok(Json(paintings::list_artists(&state.pool).await?))
}
