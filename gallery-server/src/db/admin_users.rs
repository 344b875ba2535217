//! Admin user queries

use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdminUser {
    pub id: i64,
    pub email: String,
    pub hashed_password: String,
    pub name: String,
    pub created_at: i64,
}

/// Admin user without the password hash, safe for API responses
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminUserPublic {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub created_at: i64,
}

impl From<AdminUser> for AdminUserPublic {
    fn from(user: AdminUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
        }
    }
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<AdminUser>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM admin_users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<AdminUser>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM admin_users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<AdminUserPublic>, sqlx::Error> {
    sqlx::query_as("SELECT id, email, name, created_at FROM admin_users ORDER BY created_at")
        .fetch_all(pool)
        .await
}

pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admin_users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn create(
    pool: &PgPool,
    email: &str,
    hashed_password: &str,
    name: &str,
    now: i64,
) -> Result<AdminUser, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO admin_users (email, hashed_password, name, created_at)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(email)
    .bind(hashed_password)
    .bind(name)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM admin_users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
