//! Admin login and identity

use axum::{
    Extension, Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use shared::error::AppError;

use crate::auth::{self, AdminIdentity};
use crate::db::admin_users::{self, AdminUserPublic};
use crate::error::ServiceError;
use crate::state::AppState;

/// Routes that require no token
pub fn public_router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Routes behind the JWT middleware
pub fn router() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AdminUserPublic,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServiceError> {
    let email = req.email.trim().to_lowercase();

    // Same error for unknown email and wrong password
    let user = admin_users::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(AppError::invalid_credentials)?;

    if !auth::verify_password(&req.password, &user.hashed_password) {
        return Err(AppError::invalid_credentials().into());
    }

    let token = auth::create_token(user.id, &user.email, &state.jwt_secret)
        .map_err(|e| AppError::internal(format!("Token creation failed: {e}")))?;

    tracing::info!(email = %user.email, "Admin login");

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
) -> Result<Json<AdminUserPublic>, ServiceError> {
    let user = admin_users::find_by_id(&state.pool, identity.admin_id)
        .await?
        .ok_or_else(AppError::not_authenticated)?;
    Ok(Json(user.into()))
}
