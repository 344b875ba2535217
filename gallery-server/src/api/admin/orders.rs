//! Admin order management
//!
//! Manual status edits are validated against the `OrderStatus` transition
//! table. A manual move to `paid` goes through the same atomic
//! `mark_paid_if_unpaid` guard as the reconciler, so an admin racing a
//! provider webhook still produces exactly one paid transition and one
//! confirmation email.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};

use shared::error::{AppError, ErrorCode};
use shared::models::order::OrderStatus;

use crate::db::orders::{self, Order, OrderFilter, OrderItem, OrderStats};
use crate::error::ServiceError;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list))
        .route("/orders/{id}", get(get_by_id))
        .route("/orders/{id}/status", put(update_status))
        .route("/stats", get(stats))
}

/// Order with its line items, as the admin panel consumes it
#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OrderPage {
    pub data: Vec<OrderWithItems>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<OrderPage>, ServiceError> {
    if let Some(status) = &query.status
        && OrderStatus::from_db(status).is_none()
    {
        return Err(AppError::validation(format!("Unknown status: {status}")).into());
    }

    let per_page = query
        .per_page
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let page = query.page.unwrap_or(1).max(1);

    let filter = OrderFilter {
        status: query.status,
        search: query.search,
        limit: per_page,
        offset: (page - 1) * per_page,
    };

    let (page_orders, total) = orders::list(&state.pool, &filter).await?;

    let mut data = Vec::with_capacity(page_orders.len());
    for order in page_orders {
        let items = orders::items_for(&state.pool, order.id).await?;
        data.push(OrderWithItems { order, items });
    }

    Ok(Json(OrderPage {
        data,
        total,
        page,
        per_page,
    }))
}

async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OrderWithItems>, ServiceError> {
    let order = orders::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    let items = orders::items_for(&state.pool, order.id).await?;
    Ok(Json(OrderWithItems { order, items }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, ServiceError> {
    let order = orders::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    let current = OrderStatus::from_db(&order.status)
        .ok_or_else(|| AppError::internal(format!("Corrupt order status: {}", order.status)))?;
    let target = req.status;

    if !current.can_transition_to(target) {
        return Err(AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            format!("Cannot change order from {current} to {target}"),
        )
        .into());
    }

    let updated = if target == OrderStatus::Paid {
        let now = chrono::Utc::now().timestamp_millis();
        let transitioned = orders::mark_paid_if_unpaid(&state.pool, order.id, now).await?;
        if transitioned {
            let items = orders::items_for(&state.pool, order.id).await.unwrap_or_default();
            if let Err(e) = state.notifier.payment_confirmed(&order, &items).await {
                tracing::error!(
                    error = %e,
                    order_number = %order.order_number,
                    "Confirmation email failed after manual paid transition"
                );
            }
        }
        orders::find_by_id(&state.pool, id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?
    } else {
        let updated = orders::update_status(&state.pool, id, target.as_db())
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

        if matches!(
            target,
            OrderStatus::Shipped | OrderStatus::Delivered | OrderStatus::Cancelled
        ) && let Err(e) = state.notifier.status_changed(&updated, target).await
        {
            tracing::error!(
                error = %e,
                order_number = %updated.order_number,
                "Status change email failed"
            );
        }
        updated
    };

    tracing::info!(
        order_number = %updated.order_number,
        from = %current,
        to = %target,
        "Order status updated"
    );

    Ok(Json(updated))
}

async fn stats(State(state): State<AppState>) -> Result<Json<OrderStats>, ServiceError> {
    Ok(Json(orders::stats(&state.pool).await?))
}
