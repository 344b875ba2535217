//! Admin user management

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

use shared::error::{AppError, ErrorCode};

use crate::auth::{self, AdminIdentity};
use crate::db::admin_users::{self, AdminUserPublic};
use crate::error::ServiceError;
use crate::state::AppState;
use crate::validation::{MAX_NAME_LEN, validate_email, validate_required_text};

const MIN_PASSWORD_LEN: usize = 8;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list).post(create))
        .route("/users/{id}", axum::routing::delete(delete))
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<AdminUserPublic>>, ServiceError> {
    Ok(Json(admin_users::list(&state.pool).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateAdminRequest>,
) -> Result<(StatusCode, Json<AdminUserPublic>), ServiceError> {
    let email = req.email.trim().to_lowercase();
    validate_email(&email)?;
    validate_required_text(&req.name, "name", MAX_NAME_LEN)?;
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ))
        .into());
    }

    if admin_users::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::new(ErrorCode::AdminEmailExists).into());
    }

    let hashed = auth::hash_password(&req.password)?;
    let now = chrono::Utc::now().timestamp_millis();
    let user = admin_users::create(&state.pool, &email, &hashed, req.name.trim(), now).await?;

    tracing::info!(email = %user.email, "Admin user created");

    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    if id == identity.admin_id {
        return Err(AppError::new(ErrorCode::AdminCannotDeleteSelf).into());
    }

    if !admin_users::delete(&state.pool, id).await? {
        return Err(AppError::new(ErrorCode::AdminUserNotFound).into());
    }

    Ok(StatusCode::NO_CONTENT)
}
