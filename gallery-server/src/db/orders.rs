//! Order store
//!
//! Owns the orders/order_items tables. Order creation is one transaction:
//! purchasability checks, order + item inserts, and the floor-clamped stock
//! decrements all commit or roll back together.
//!
//! `mark_paid_if_unpaid` is the reconciler's atomic check-and-set: a single
//! conditional UPDATE whose row count tells the caller whether this
//! invocation performed the pending -> paid transition. Concurrent callers
//! (IPN, verify poll, admin) race on the row, not on a read-then-write.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::error::{AppError, ErrorCode};
use shared::models::order::PAYMENT_METHOD;

use crate::db::paintings;
use crate::error::ServiceError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub status: String,
    pub payment_method: String,
    pub pesapal_tracking_id: Option<String>,
    pub pesapal_merchant_reference: Option<String>,
    pub paid_at: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub painting_id: i64,
    pub painting_title: String,
    pub price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

/// Customer snapshot captured at order time (there are no customer accounts)
#[derive(Debug, Clone)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub shipping_address: String,
}

/// A line to be persisted with a new order
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub painting_id: i64,
    pub painting_title: String,
    pub price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

/// Externally-visible unique order number: stable prefix + opaque suffix
pub fn generate_order_number() -> String {
    let suffix = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("ORD-{}", &suffix[..12])
}

/// Create order + items and decrement stock, atomically.
///
/// Each referenced painting must exist and be purchasable; the rows are
/// locked for the duration of the transaction so two concurrent checkouts
/// decrement sequentially.
pub async fn create_order(
    pool: &PgPool,
    customer: &CustomerInfo,
    items: &[NewOrderItem],
    subtotal: Decimal,
    shipping_cost: Decimal,
    total: Decimal,
    now: i64,
) -> Result<Order, ServiceError> {
    if items.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty).into());
    }

    let mut tx = pool.begin().await?;

    let order: Order = sqlx::query_as(
        "INSERT INTO orders
            (order_number, customer_name, customer_email, customer_phone,
             shipping_address, subtotal, shipping_cost, total, status,
             payment_method, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9, $10)
         RETURNING *",
    )
    .bind(generate_order_number())
    .bind(&customer.name)
    .bind(&customer.email)
    .bind(&customer.phone)
    .bind(&customer.shipping_address)
    .bind(subtotal)
    .bind(shipping_cost)
    .bind(total)
    .bind(PAYMENT_METHOD)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    for item in items {
        // Lock the painting row: concurrent checkouts of the same piece
        // (and duplicate lines within one order) decrement sequentially.
        let painting: Option<paintings::Painting> =
            sqlx::query_as("SELECT * FROM paintings WHERE id = $1 FOR UPDATE")
                .bind(item.painting_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(painting) = painting else {
            return Err(AppError::with_message(
                ErrorCode::PaintingNotFound,
                format!("Painting {} not found", item.painting_id),
            )
            .into());
        };
        if !painting.is_purchasable() {
            return Err(AppError::with_message(
                ErrorCode::PaintingUnavailable,
                format!("\"{}\" is no longer available", painting.title),
            )
            .into());
        }

        sqlx::query(
            "INSERT INTO order_items
                (order_id, painting_id, painting_title, price, quantity, subtotal)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(order.id)
        .bind(item.painting_id)
        .bind(&item.painting_title)
        .bind(item.price)
        .bind(item.quantity)
        .bind(item.subtotal)
        .execute(&mut *tx)
        .await?;

        // Stock is reserved optimistically at order placement, not at
        // payment confirmation.
        let new_quantity = paintings::clamped_decrement(painting.quantity, item.quantity);
        paintings::set_stock(&mut *tx, item.painting_id, new_quantity).await?;
    }

    tx.commit().await?;
    Ok(order)
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_order_number(
    pool: &PgPool,
    order_number: &str,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(order_number)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_tracking_id(
    pool: &PgPool,
    tracking_id: &str,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE pesapal_tracking_id = $1")
        .bind(tracking_id)
        .fetch_optional(pool)
        .await
}

pub async fn items_for(pool: &PgPool, order_id: i64) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(pool)
        .await
}

/// Attach gateway correlation fields after a successful submission.
/// Re-initiation overwrites: only the most recent submission is meaningful.
pub async fn attach_gateway_refs(
    pool: &PgPool,
    id: i64,
    tracking_id: &str,
    merchant_reference: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE orders
         SET pesapal_tracking_id = $2, pesapal_merchant_reference = $3
         WHERE id = $1",
    )
    .bind(id)
    .bind(tracking_id)
    .bind(merchant_reference)
    .execute(pool)
    .await?;
    Ok(())
}

/// The idempotent pending -> paid transition.
///
/// Returns true only for the invocation that actually flipped the row;
/// every other concurrent or repeated call sees zero rows affected.
/// `paid` is reachable from `pending` alone, so a late IPN retry can never
/// drag an already-shipped order back to `paid`.
pub async fn mark_paid_if_unpaid(pool: &PgPool, id: i64, paid_at: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders
         SET status = 'paid', paid_at = $2
         WHERE id = $1 AND status = 'pending'",
    )
    .bind(id)
    .bind(paid_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Operator-driven status write. Does not touch paid_at; manual `paid`
/// transitions go through [`mark_paid_if_unpaid`] instead.
pub async fn update_status(
    pool: &PgPool,
    id: i64,
    status: &str,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("UPDATE orders SET status = $2 WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
}

/// Admin listing filters
#[derive(Debug, Default)]
pub struct OrderFilter {
    pub status: Option<String>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Paginated admin listing with status filter and free-text search over
/// order number / customer name / customer email. Returns (page, total).
pub async fn list(pool: &PgPool, filter: &OrderFilter) -> Result<(Vec<Order>, i64), sqlx::Error> {
    let orders: Vec<Order> = sqlx::query_as(
        "SELECT * FROM orders
         WHERE ($1::text IS NULL OR status = $1)
           AND ($2::text IS NULL
                OR order_number ILIKE '%' || $2 || '%'
                OR customer_name ILIKE '%' || $2 || '%'
                OR customer_email ILIKE '%' || $2 || '%')
         ORDER BY created_at DESC
         LIMIT $3 OFFSET $4",
    )
    .bind(&filter.status)
    .bind(&filter.search)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;

    let (total,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM orders
         WHERE ($1::text IS NULL OR status = $1)
           AND ($2::text IS NULL
                OR order_number ILIKE '%' || $2 || '%'
                OR customer_name ILIKE '%' || $2 || '%'
                OR customer_email ILIKE '%' || $2 || '%')",
    )
    .bind(&filter.status)
    .bind(&filter.search)
    .fetch_one(pool)
    .await?;

    Ok((orders, total))
}

/// Dashboard statistics
#[derive(Debug, Serialize)]
pub struct OrderStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub total_revenue: Decimal,
    pub total_paintings: i64,
    pub sold_out_paintings: i64,
    pub recent_orders: Vec<Order>,
}

pub async fn stats(pool: &PgPool) -> Result<OrderStats, sqlx::Error> {
    let (total_orders,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
        .fetch_one(pool)
        .await?;
    let (pending_orders,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM orders WHERE status = 'pending'")
            .fetch_one(pool)
            .await?;
    // Revenue counts every order that reached paid, whatever its current
    // fulfillment status.
    let (total_revenue,): (Decimal,) =
        sqlx::query_as("SELECT COALESCE(SUM(total), 0) FROM orders WHERE paid_at IS NOT NULL")
            .fetch_one(pool)
            .await?;
    let (total_paintings,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM paintings")
        .fetch_one(pool)
        .await?;
    let (sold_out_paintings,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM paintings WHERE quantity = 0")
            .fetch_one(pool)
            .await?;
    let recent_orders: Vec<Order> =
        sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC LIMIT 5")
            .fetch_all(pool)
            .await?;

    Ok(OrderStats {
        total_orders,
        pending_orders,
        total_revenue,
        total_paintings,
        sold_out_paintings,
        recent_orders,
    })
}

// ============================================================================
// OrderStore trait: the persistence seam the reconciler depends on
// ============================================================================

/// The slice of order persistence the payment reconciler needs.
///
/// Production uses [`PgOrderStore`]; reconciliation tests substitute an
/// in-memory store so the idempotence guarantees can be exercised without
/// a live database.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Order>, BoxError>;
    async fn find_by_order_number(&self, order_number: &str) -> Result<Option<Order>, BoxError>;
    async fn find_by_tracking_id(&self, tracking_id: &str) -> Result<Option<Order>, BoxError>;
    async fn attach_gateway_refs(
        &self,
        id: i64,
        tracking_id: &str,
        merchant_reference: &str,
    ) -> Result<(), BoxError>;
    /// Atomic check-and-set; true only when this call performed the
    /// pending -> paid transition.
    async fn mark_paid_if_unpaid(&self, id: i64, paid_at: i64) -> Result<bool, BoxError>;
    async fn items_for(&self, order_id: i64) -> Result<Vec<OrderItem>, BoxError>;
}

/// PostgreSQL-backed [`OrderStore`]
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Order>, BoxError> {
        Ok(find_by_id(&self.pool, id).await?)
    }

    async fn find_by_order_number(&self, order_number: &str) -> Result<Option<Order>, BoxError> {
        Ok(find_by_order_number(&self.pool, order_number).await?)
    }

    async fn find_by_tracking_id(&self, tracking_id: &str) -> Result<Option<Order>, BoxError> {
        Ok(find_by_tracking_id(&self.pool, tracking_id).await?)
    }

    async fn attach_gateway_refs(
        &self,
        id: i64,
        tracking_id: &str,
        merchant_reference: &str,
    ) -> Result<(), BoxError> {
        Ok(attach_gateway_refs(&self.pool, id, tracking_id, merchant_reference).await?)
    }

    async fn mark_paid_if_unpaid(&self, id: i64, paid_at: i64) -> Result<bool, BoxError> {
        Ok(mark_paid_if_unpaid(&self.pool, id, paid_at).await?)
    }

    async fn items_for(&self, order_id: i64) -> Result<Vec<OrderItem>, BoxError> {
        Ok(items_for(&self.pool, order_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_format() {
        let number = generate_order_number();
        assert!(number.starts_with("ORD-"));
        assert_eq!(number.len(), 16);
        let suffix = &number[4..];
        assert!(suffix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_order_numbers_unique() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(generate_order_number()));
        }
    }
}
