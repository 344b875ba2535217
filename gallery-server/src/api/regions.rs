//! Public delivery region API

use axum::{Json, Router, extract::State, routing::get};

use crate::db::regions::{self, DeliveryRegion};
use crate::error::ServiceError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/regions", get(list))
}

/// Active delivery regions for the checkout page
async fn list(State(state): State<AppState>) -> Result<Json<Vec<DeliveryRegion>>, ServiceError> {
    Ok(Json(regions::list_active(&state.pool).await?))
}
