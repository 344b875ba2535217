//! API routes
//!
//! # Structure
//!
//! - [`health`] - health check
//! - [`paintings`] - public catalog
//! - [`regions`] - public delivery regions
//! - [`orders`] - checkout
//! - [`payments`] - payment initiation, IPN callback, verify poll
//! - [`admin`] - JWT-protected management API

pub mod admin;
pub mod health;
pub mod orders;
pub mod paintings;
pub mod payments;
pub mod regions;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(paintings::router())
        .merge(regions::router())
        .merge(orders::router())
        .merge(payments::router())
        .nest("/api/admin", admin::router(state.clone()))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
