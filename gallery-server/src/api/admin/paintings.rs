//! Admin catalog management

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use shared::error::{AppError, ErrorCode};

use crate::db::paintings::{self, NewPainting, Painting, PaintingUpdate};
use crate::error::ServiceError;
use crate::state::AppState;
use crate::validation::{
    MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, MAX_TEXT_LEN, MAX_URL_LEN, validate_optional_text,
    validate_required_text,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/paintings", get(list).post(create))
        .route(
            "/paintings/{id}",
            get(get_by_id).put(update).delete(delete),
        )
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<Painting>>, ServiceError> {
    Ok(Json(paintings::list_all(&state.pool).await?))
}

async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Painting>, ServiceError> {
    let painting = paintings::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(painting))
}

fn not_found(id: i64) -> AppError {
    AppError::with_message(ErrorCode::PaintingNotFound, format!("Painting {id} not found"))
}

#[derive(Debug, Deserialize)]
pub struct CreatePaintingRequest {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub size: Option<String>,
    pub medium: Option<String>,
    pub year: Option<i32>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_quantity() -> i32 {
    1
}

fn default_true() -> bool {
    true
}

fn validate_common(
    price: Decimal,
    quantity: i32,
    size: &Option<String>,
    medium: &Option<String>,
    image_url: &Option<String>,
) -> Result<(), AppError> {
    if price < Decimal::ZERO {
        return Err(AppError::validation("price must be non-negative"));
    }
    if quantity < 0 {
        return Err(AppError::validation("quantity must be non-negative"));
    }
    validate_optional_text(size, "size", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(medium, "medium", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(image_url, "image_url", MAX_URL_LEN)?;
    Ok(())
}

async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreatePaintingRequest>,
) -> Result<(StatusCode, Json<Painting>), ServiceError> {
    validate_required_text(&req.title, "title", MAX_NAME_LEN)?;
    validate_required_text(&req.artist, "artist", MAX_NAME_LEN)?;
    if req.description.len() > MAX_TEXT_LEN {
        return Err(AppError::validation("description is too long").into());
    }
    validate_common(req.price, req.quantity, &req.size, &req.medium, &req.image_url)?;

    let data = NewPainting {
        title: req.title.trim().to_string(),
        artist: req.artist.trim().to_string(),
        description: req.description,
        price: req.price,
        quantity: req.quantity,
        size: req.size,
        medium: req.medium,
        year: req.year,
        image_url: req.image_url,
        is_featured: req.is_featured,
        is_available: req.is_available,
    };

    let now = chrono::Utc::now().timestamp_millis();
    let painting = paintings::create(&state.pool, &data, now).await?;

    tracing::info!(id = painting.id, title = %painting.title, "Painting created");

    Ok((StatusCode::CREATED, Json(painting)))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaintingRequest {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub size: Option<String>,
    pub medium: Option<String>,
    pub year: Option<i32>,
    pub image_url: Option<String>,
    pub is_featured: Option<bool>,
    pub is_available: Option<bool>,
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePaintingRequest>,
) -> Result<Json<Painting>, ServiceError> {
    if let Some(title) = &req.title {
        validate_required_text(title, "title", MAX_NAME_LEN)?;
    }
    if let Some(artist) = &req.artist {
        validate_required_text(artist, "artist", MAX_NAME_LEN)?;
    }
    validate_common(
        req.price.unwrap_or_default(),
        req.quantity.unwrap_or_default(),
        &req.size,
        &req.medium,
        &req.image_url,
    )?;

    let data = PaintingUpdate {
        title: req.title,
        artist: req.artist,
        description: req.description,
        price: req.price,
        quantity: req.quantity,
        size: req.size,
        medium: req.medium,
        year: req.year,
        image_url: req.image_url,
        is_featured: req.is_featured,
        is_available: req.is_available,
    };

    let painting = paintings::update(&state.pool, id, &data)
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(painting))
}

async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    if !paintings::delete(&state.pool, id).await? {
        return Err(not_found(id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}
