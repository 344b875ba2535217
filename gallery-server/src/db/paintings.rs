//! Painting catalog queries
//!
//! Includes the inventory adjuster: `clamped_decrement` + `set_stock`
//! perform the floor-clamped decrement under a row lock, so stock never
//! goes negative regardless of the ordered quantity.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Painting {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
    pub size: Option<String>,
    pub medium: Option<String>,
    pub year: Option<i32>,
    pub image_url: Option<String>,
    pub is_featured: bool,
    pub is_available: bool,
    pub created_at: i64,
}

impl Painting {
    /// A painting can be ordered only while it is listed and in stock
    pub fn is_purchasable(&self) -> bool {
        self.is_available && self.quantity > 0
    }
}

/// Filters for the public catalog listing
#[derive(Debug, Default)]
pub struct PaintingFilter {
    pub artist: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_desc: bool,
    pub limit: i64,
    pub offset: i64,
}

/// Whitelist sort columns; anything else falls back to created_at
fn sort_column(requested: Option<&str>) -> &'static str {
    match requested {
        Some("price") => "price",
        Some("title") => "title",
        Some("artist") => "artist",
        Some("year") => "year",
        _ => "created_at",
    }
}

/// List available paintings with optional filters (public gallery)
pub async fn list_available(
    pool: &PgPool,
    filter: &PaintingFilter,
) -> Result<Vec<Painting>, sqlx::Error> {
    let order_by = sort_column(filter.sort_by.as_deref());
    let direction = if filter.sort_desc { "DESC" } else { "ASC" };
    let query = format!(
        "SELECT * FROM paintings
         WHERE is_available = TRUE AND quantity > 0
           AND ($1::text IS NULL OR artist ILIKE '%' || $1 || '%')
           AND ($2::numeric IS NULL OR price >= $2)
           AND ($3::numeric IS NULL OR price <= $3)
           AND ($4::text IS NULL
                OR title ILIKE '%' || $4 || '%'
                OR artist ILIKE '%' || $4 || '%'
                OR description ILIKE '%' || $4 || '%')
         ORDER BY {order_by} {direction}
         LIMIT $5 OFFSET $6"
    );

    sqlx::query_as(&query)
        .bind(&filter.artist)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(&filter.search)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(pool)
        .await
}

/// Featured paintings for the home page (max 6)
pub async fn list_featured(pool: &PgPool) -> Result<Vec<Painting>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM paintings
         WHERE is_available = TRUE AND quantity > 0 AND is_featured = TRUE
         ORDER BY created_at DESC
         LIMIT 6",
    )
    .fetch_all(pool)
    .await
}

/// Every painting, including unlisted ones (admin)
pub async fn list_all(pool: &PgPool) -> Result<Vec<Painting>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM paintings ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Painting>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM paintings WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Distinct artist names, sorted
pub async fn list_artists(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT DISTINCT artist FROM paintings ORDER BY artist")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(artist,)| artist).collect())
}

pub struct NewPainting {
    pub title: String,
    pub artist: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
    pub size: Option<String>,
    pub medium: Option<String>,
    pub year: Option<i32>,
    pub image_url: Option<String>,
    pub is_featured: bool,
    pub is_available: bool,
}

pub async fn create(pool: &PgPool, data: &NewPainting, now: i64) -> Result<Painting, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO paintings
            (title, artist, description, price, quantity, size, medium, year,
             image_url, is_featured, is_available, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
         RETURNING *",
    )
    .bind(&data.title)
    .bind(&data.artist)
    .bind(&data.description)
    .bind(data.price)
    .bind(data.quantity)
    .bind(&data.size)
    .bind(&data.medium)
    .bind(data.year)
    .bind(&data.image_url)
    .bind(data.is_featured)
    .bind(data.is_available)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Partial update: absent fields keep their current value
#[derive(Debug, Default)]
pub struct PaintingUpdate {
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

pub async fn update(
    pool: &PgPool,
    id: i64,
    data: &PaintingUpdate,
) -> Result<Option<Painting>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE paintings SET
            title        = COALESCE($2, title),
            artist       = COALESCE($3, artist),
            description  = COALESCE($4, description),
            price        = COALESCE($5, price),
            quantity     = COALESCE($6, quantity),
            size         = COALESCE($7, size),
            medium       = COALESCE($8, medium),
            year         = COALESCE($9, year),
            image_url    = COALESCE($10, image_url),
            is_featured  = COALESCE($11, is_featured),
            is_available = COALESCE($12, is_available)
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(&data.title)
    .bind(&data.artist)
    .bind(&data.description)
    .bind(data.price)
    .bind(data.quantity)
    .bind(&data.size)
    .bind(&data.medium)
    .bind(data.year)
    .bind(&data.image_url)
    .bind(data.is_featured)
    .bind(data.is_available)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM paintings WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Floor-clamped stock decrement: ordering more than is available drains
/// stock to zero, never below.
pub fn clamped_decrement(current: i32, ordered: i32) -> i32 {
    (current - ordered).max(0)
}

/// Write back a stock level computed under a row lock; runs inside the
/// checkout transaction via the executor argument.
pub async fn set_stock<'e, E>(executor: E, id: i64, quantity: i32) -> Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query("UPDATE paintings SET quantity = $2 WHERE id = $1")
        .bind(id)
        .bind(quantity)
        .execute(executor)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn painting(quantity: i32, is_available: bool) -> Painting {
        Painting {
            id: 1,
            title: "Sunset".into(),
            artist: "A. Painter".into(),
            description: String::new(),
            price: Decimal::from(1000),
            quantity,
            size: None,
            medium: None,
            year: None,
            image_url: None,
            is_featured: false,
            is_available,
            created_at: 0,
        }
    }

    #[test]
    fn test_purchasable() {
        assert!(painting(1, true).is_purchasable());
        assert!(!painting(0, true).is_purchasable());
        assert!(!painting(1, false).is_purchasable());
    }

    #[test]
    fn test_clamped_decrement_floor() {
        assert_eq!(clamped_decrement(5, 2), 3);
        assert_eq!(clamped_decrement(2, 2), 0);
        // Ordering more than available stock never drives stock negative
        assert_eq!(clamped_decrement(1, 3), 0);
        assert_eq!(clamped_decrement(0, 1), 0);
    }

    #[test]
    fn test_sort_column_whitelist() {
        assert_eq!(sort_column(Some("price")), "price");
        assert_eq!(sort_column(Some("year")), "year");
        // Injection attempts and unknown columns fall back to created_at
        assert_eq!(sort_column(Some("price; DROP TABLE paintings")), "created_at");
        assert_eq!(sort_column(None), "created_at");
    }
}
