//! Payment API: the two thin adapters over the reconciler
//!
//! The provider pushes an IPN callback and the customer's browser polls the
//! verify endpoint after redirect-back; both feed the same idempotent
//! `reconcile` operation. The IPN response contract: acknowledge with 200
//! once reconciliation ran (whatever the provider status was), answer an
//! error status only when resolution truly failed, so the provider retries.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

use shared::error::{AppError, ErrorCode};

use crate::error::ServiceError;
use crate::payments::{GatewayError, ReconcileError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/payments/initiate", post(initiate))
        .route("/api/payments/ipn", get(ipn))
        .route("/api/payments/verify", get(verify))
}

/// Map initiation failures onto the payment error codes
fn initiate_error(err: ReconcileError) -> ServiceError {
    match err {
        ReconcileError::OrderNotFound => AppError::new(ErrorCode::OrderNotFound).into(),
        ReconcileError::Gateway(GatewayError::Auth(msg)) => {
            AppError::with_message(ErrorCode::GatewayAuthFailed, msg).into()
        }
        ReconcileError::Gateway(GatewayError::Submit(msg)) => {
            AppError::with_message(ErrorCode::GatewaySubmitFailed, msg).into()
        }
        ReconcileError::Gateway(GatewayError::Status(msg)) => {
            AppError::with_message(ErrorCode::GatewayStatusFailed, msg).into()
        }
        ReconcileError::Store(e) => ServiceError::Db(e),
    }
}

/// During reconciliation every gateway failure is one thing to the caller:
/// the reconcile pass failed and may be retried.
fn reconcile_error(err: ReconcileError) -> ServiceError {
    match err {
        ReconcileError::OrderNotFound => AppError::new(ErrorCode::OrderNotFound).into(),
        ReconcileError::Gateway(e) => {
            AppError::with_message(ErrorCode::ReconcileFailed, e.to_string()).into()
        }
        ReconcileError::Store(e) => ServiceError::Db(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct InitiateRequest {
    pub order_id: i64,
}

/// Submit the order to PesaPal and hand the redirect URL to the client
async fn initiate(
    State(state): State<AppState>,
    Json(req): Json<InitiateRequest>,
) -> Result<Json<Value>, ServiceError> {
    let payment_url = state
        .reconciler
        .initiate_payment(req.order_id)
        .await
        .map_err(initiate_error)?;

    Ok(Json(json!({ "payment_url": payment_url })))
}

/// IPN query parameters; the provider has been observed delivering both
/// casings, so both are accepted.
#[derive(Debug, Deserialize)]
pub struct IpnQuery {
    #[serde(rename = "OrderTrackingId", alias = "orderTrackingId")]
    pub order_tracking_id: Option<String>,
    #[serde(rename = "OrderMerchantReference", alias = "orderMerchantReference")]
    pub order_merchant_reference: Option<String>,
}

/// PesaPal calls this after payment (server-to-server)
async fn ipn(
    State(state): State<AppState>,
    Query(query): Query<IpnQuery>,
) -> Result<Json<Value>, ServiceError> {
    let Some(tracking_id) = query.order_tracking_id else {
        return Err(AppError::invalid_request("Missing tracking ID").into());
    };

    let outcome = state
        .reconciler
        .reconcile(&tracking_id, query.order_merchant_reference.as_deref())
        .await
        .map_err(reconcile_error)?;

    tracing::info!(
        order_number = %outcome.order_number,
        status = %outcome.payment_status,
        transitioned = outcome.transitioned,
        "IPN processed"
    );

    Ok(Json(json!({ "message": "IPN processed" })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "OrderTrackingId", alias = "orderTrackingId")]
    pub order_tracking_id: Option<String>,
    /// Our own order number, appended to the callback URL at submission
    pub order: Option<String>,
}

/// Browser-side poll after redirect-back from the hosted payment page
async fn verify(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<Value>, ServiceError> {
    let (Some(tracking_id), Some(order_number)) = (query.order_tracking_id, query.order) else {
        return Err(AppError::invalid_request("Missing tracking ID or order number").into());
    };

    let outcome = state
        .reconciler
        .reconcile(&tracking_id, Some(&order_number))
        .await
        .map_err(reconcile_error)?;

    Ok(Json(json!({
        "status": outcome.payment_status,
        "order_number": outcome.order_number,
    })))
}
