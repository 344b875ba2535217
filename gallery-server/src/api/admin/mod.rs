//! Admin API (JWT-protected except login)

pub mod auth;
pub mod orders;
pub mod paintings;
pub mod regions;
pub mod users;

use axum::{Router, middleware};

use crate::state::AppState;

/// The combined admin router, nested under /api/admin by the caller
pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(paintings::router())
        .merge(regions::router())
        .merge(orders::router())
        .layer(middleware::from_fn_with_state(
            state,
            crate::auth::admin_auth_middleware,
        ));

    Router::new().merge(auth::public_router()).merge(protected)
}
