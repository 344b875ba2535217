//! Admin delivery region management

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use shared::error::{AppError, ErrorCode};

use crate::db::regions::{self, DeliveryRegion};
use crate::error::ServiceError;
use crate::state::AppState;
use crate::validation::{MAX_NAME_LEN, validate_required_text};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/regions", get(list).post(create))
        .route("/regions/{id}", axum::routing::put(update).delete(delete))
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<DeliveryRegion>>, ServiceError> {
    Ok(Json(regions::list_all(&state.pool).await?))
}

/// Map a unique-constraint violation on the name column
fn map_region_error(err: sqlx::Error) -> ServiceError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::new(ErrorCode::RegionNameExists).into()
        }
        _ => err.into(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRegionRequest {
    pub name: String,
    pub cost: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateRegionRequest>,
) -> Result<(StatusCode, Json<DeliveryRegion>), ServiceError> {
    validate_required_text(&req.name, "name", MAX_NAME_LEN)?;
    if req.cost < Decimal::ZERO {
        return Err(AppError::validation("cost must be non-negative").into());
    }

    let region = regions::create(&state.pool, req.name.trim(), req.cost, req.is_active)
        .await
        .map_err(map_region_error)?;

    Ok((StatusCode::CREATED, Json(region)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRegionRequest {
    pub name: Option<String>,
    pub cost: Option<Decimal>,
    pub is_active: Option<bool>,
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRegionRequest>,
) -> Result<Json<DeliveryRegion>, ServiceError> {
    if let Some(name) = &req.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    if let Some(cost) = req.cost
        && cost < Decimal::ZERO
    {
        return Err(AppError::validation("cost must be non-negative").into());
    }

    let region = regions::update(&state.pool, id, req.name.as_deref(), req.cost, req.is_active)
        .await
        .map_err(map_region_error)?
        .ok_or_else(|| AppError::new(ErrorCode::RegionNotFound))?;

    Ok(Json(region))
}

async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    if !regions::delete(&state.pool, id).await? {
        return Err(AppError::new(ErrorCode::RegionNotFound).into());
    }
    Ok(StatusCode::NO_CONTENT)
}
