//! Delivery region queries

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DeliveryRegion {
    pub id: i64,
    pub name: String,
    pub cost: Decimal,
    pub is_active: bool,
}

/// Active regions for the public checkout page, ordered by name
pub async fn list_active(pool: &PgPool) -> Result<Vec<DeliveryRegion>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM delivery_regions WHERE is_active = TRUE ORDER BY name")
        .fetch_all(pool)
        .await
}

/// Every region, including inactive ones (admin)
pub async fn list_all(pool: &PgPool) -> Result<Vec<DeliveryRegion>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM delivery_regions ORDER BY name")
        .fetch_all(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<DeliveryRegion>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM delivery_regions WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create(
    pool: &PgPool,
    name: &str,
    cost: Decimal,
    is_active: bool,
) -> Result<DeliveryRegion, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO delivery_regions (name, cost, is_active)
         VALUES ($1, $2, $3)
         RETURNING *",
    )
    .bind(name)
    .bind(cost)
    .bind(is_active)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: i64,
    name: Option<&str>,
    cost: Option<Decimal>,
    is_active: Option<bool>,
) -> Result<Option<DeliveryRegion>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE delivery_regions SET
            name      = COALESCE($2, name),
            cost      = COALESCE($3, cost),
            is_active = COALESCE($4, is_active)
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(cost)
    .bind(is_active)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM delivery_regions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
