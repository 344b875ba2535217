//! Checkout API
//!
//! Creating an order reserves stock immediately (floor-clamped decrement),
//! before any payment has happened.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::orders::{self, CustomerInfo, NewOrderItem};
use crate::error::ServiceError;
use crate::money::{self, CheckoutLine};
use crate::state::AppState;
use crate::validation::{
    MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, MAX_TEXT_LEN, validate_email, validate_required_text,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/orders", post(create))
}

#[derive(Debug, Deserialize)]
pub struct CheckoutItem {
    pub painting_id: i64,
    pub painting_title: String,
    pub price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub items: Vec<CheckoutItem>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub message: String,
    pub order_number: String,
    pub order_id: i64,
}

/// Place an order (checkout submission)
async fn create(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ServiceError> {
    validate_required_text(&req.customer_name, "customer_name", MAX_NAME_LEN)?;
    validate_email(&req.customer_email)?;
    validate_required_text(&req.customer_phone, "customer_phone", MAX_SHORT_TEXT_LEN)?;
    validate_required_text(&req.shipping_address, "shipping_address", MAX_TEXT_LEN)?;

    // Line subtotals are computed server-side; the client's declared
    // subtotal/total must agree with them exactly.
    let lines: Vec<CheckoutLine> = req
        .items
        .iter()
        .map(|item| CheckoutLine {
            price: item.price,
            quantity: item.quantity,
        })
        .collect();
    money::validate_order_money(&lines, req.subtotal, req.shipping_cost, req.total)?;

    for item in &req.items {
        validate_required_text(&item.painting_title, "painting_title", MAX_NAME_LEN)?;
    }

    let customer = CustomerInfo {
        name: req.customer_name.trim().to_string(),
        email: req.customer_email.trim().to_lowercase(),
        phone: req.customer_phone.trim().to_string(),
        shipping_address: req.shipping_address.trim().to_string(),
    };

    let items: Vec<NewOrderItem> = req
        .items
        .iter()
        .map(|item| NewOrderItem {
            painting_id: item.painting_id,
            painting_title: item.painting_title.clone(),
            price: item.price,
            quantity: item.quantity,
            subtotal: money::line_subtotal(item.price, item.quantity),
        })
        .collect();

    let now = chrono::Utc::now().timestamp_millis();
    let order = orders::create_order(
        &state.pool,
        &customer,
        &items,
        req.subtotal,
        req.shipping_cost,
        req.total,
        now,
    )
    .await?;

    tracing::info!(
        order_number = %order.order_number,
        total = %order.total,
        "Order placed"
    );

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            message: "Order placed successfully".to_string(),
            order_number: order.order_number,
            order_id: order.id,
        }),
    ))
}
