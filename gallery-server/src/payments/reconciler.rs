//! Order-payment reconciler
//!
//! The single state machine behind both payment-completion triggers: the
//! provider's IPN callback and the customer's browser-side verify poll.
//! Both adapters feed the same `reconcile` operation, so the pending ->
//! paid transition and its side effect (the confirmation email) happen
//! exactly once no matter how many times, or how concurrently, the
//! triggers fire. The atomicity lives in `OrderStore::mark_paid_if_unpaid`
//! (a conditional UPDATE on the order row), not in any lock held here.

use std::sync::Arc;
use thiserror::Error;

use crate::db::orders::{OrderStore, PgOrderStore};
use crate::email::Notifier;
use crate::payments::pesapal::{GatewayError, PaymentGateway};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures surfaced by payment initiation and reconciliation
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Neither the merchant reference nor the tracking id resolved an
    /// order. Alert-worthy: it signals a correlation mismatch, so callers
    /// report it instead of retrying.
    #[error("no order matches the payment notification")]
    OrderNotFound,
    /// The gateway call failed; the caller decides whether to retry
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// Order store failure
    #[error("order store failure: {0}")]
    Store(BoxError),
}

/// Result of a reconcile pass, reported back to the poll UI / IPN response
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub order_number: String,
    /// Provider status description ("Pending" when the provider omitted it)
    pub payment_status: String,
    /// Whether this call performed the pending -> paid transition
    pub transitioned: bool,
}

pub struct Reconciler {
    store: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn OrderStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
        }
    }

    /// Convenience constructor for the production wiring
    pub fn with_pg(
        store: PgOrderStore,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::new(Arc::new(store), gateway, notifier)
    }

    /// Submit an order to the gateway and persist the correlation fields.
    ///
    /// The order status is untouched (still `pending`), so the operation is
    /// safely retryable: a repeated call re-submits and overwrites the
    /// correlation fields, and only the most recent submission matters.
    /// On gateway failure the order is not mutated at all.
    pub async fn initiate_payment(&self, order_id: i64) -> Result<String, ReconcileError> {
        let order = self
            .store
            .find_by_id(order_id)
            .await
            .map_err(ReconcileError::Store)?
            .ok_or(ReconcileError::OrderNotFound)?;

        let submission = self.gateway.submit_order(&order).await?;

        self.store
            .attach_gateway_refs(
                order.id,
                &submission.order_tracking_id,
                &submission.merchant_reference,
            )
            .await
            .map_err(ReconcileError::Store)?;

        tracing::info!(
            order_number = %order.order_number,
            tracking_id = %submission.order_tracking_id,
            "Payment initiated"
        );

        Ok(submission.redirect_url)
    }

    /// The idempotent core transition, shared by the IPN and verify-poll
    /// adapters.
    ///
    /// Resolution tries the merchant reference (our own order number)
    /// first and falls back to the tracking id, so the operation succeeds
    /// with whichever identifier the caller actually has.
    pub async fn reconcile(
        &self,
        tracking_id: &str,
        merchant_reference: Option<&str>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let mut order = None;
        if let Some(reference) = merchant_reference {
            order = self
                .store
                .find_by_order_number(reference)
                .await
                .map_err(ReconcileError::Store)?;
        }
        let order = match order {
            Some(order) => order,
            None => self
                .store
                .find_by_tracking_id(tracking_id)
                .await
                .map_err(ReconcileError::Store)?
                .ok_or(ReconcileError::OrderNotFound)?,
        };

        let status = self.gateway.transaction_status(tracking_id).await?;

        let mut transitioned = false;
        if status.is_completed() {
            let now = chrono::Utc::now().timestamp_millis();
            transitioned = self
                .store
                .mark_paid_if_unpaid(order.id, now)
                .await
                .map_err(ReconcileError::Store)?;

            if transitioned {
                tracing::info!(order_number = %order.order_number, "Order paid");

                // Payment confirmation is authoritative whether or not the
                // email goes out.
                let items = match self.store.items_for(order.id).await {
                    Ok(items) => items,
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            order_number = %order.order_number,
                            "Failed to load items for confirmation email"
                        );
                        Vec::new()
                    }
                };
                if let Err(e) = self.notifier.payment_confirmed(&order, &items).await {
                    tracing::error!(
                        error = %e,
                        order_number = %order.order_number,
                        "Confirmation email failed after payment"
                    );
                }
            }
        }

        Ok(ReconcileOutcome {
            order_number: order.order_number,
            payment_status: status
                .payment_status_description
                .unwrap_or_else(|| "Pending".to_string()),
            transitioned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::orders::{Order, OrderItem};
    use crate::payments::pesapal::{GatewaySubmission, TransactionStatus};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use shared::models::order::{OrderStatus, PAYMENT_METHOD};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    fn test_order(id: i64, order_number: &str, tracking_id: Option<&str>) -> Order {
        Order {
            id,
            order_number: order_number.to_string(),
            customer_name: "Jane Doe".into(),
            customer_email: "jane@example.com".into(),
            customer_phone: "+254700000000".into(),
            shipping_address: "12 Gallery Lane, Nairobi".into(),
            subtotal: Decimal::from(2000),
            shipping_cost: Decimal::from(500),
            total: Decimal::from(2500),
            status: OrderStatus::Pending.as_db().to_string(),
            payment_method: PAYMENT_METHOD.to_string(),
            pesapal_tracking_id: tracking_id.map(str::to_string),
            pesapal_merchant_reference: tracking_id.map(|_| order_number.to_string()),
            paid_at: None,
            created_at: 1_700_000_000_000,
        }
    }

    fn test_items(order_id: i64) -> Vec<OrderItem> {
        vec![OrderItem {
            id: 1,
            order_id,
            painting_id: 7,
            painting_title: "Sunset over the Rift".into(),
            price: Decimal::from(1000),
            quantity: 2,
            subtotal: Decimal::from(2000),
        }]
    }

    /// In-memory OrderStore; mark_paid_if_unpaid checks and sets under one
    /// mutex guard, mirroring the conditional UPDATE's atomicity.
    struct MemoryStore {
        orders: Mutex<HashMap<i64, Order>>,
    }

    impl MemoryStore {
        fn with_order(order: Order) -> Arc<Self> {
            let mut orders = HashMap::new();
            orders.insert(order.id, order);
            Arc::new(Self {
                orders: Mutex::new(orders),
            })
        }

        async fn order(&self, id: i64) -> Order {
            self.orders.lock().await.get(&id).cloned().unwrap()
        }
    }

    #[async_trait]
    impl OrderStore for MemoryStore {
        async fn find_by_id(&self, id: i64) -> Result<Option<Order>, BoxError> {
            Ok(self.orders.lock().await.get(&id).cloned())
        }

        async fn find_by_order_number(
            &self,
            order_number: &str,
        ) -> Result<Option<Order>, BoxError> {
            Ok(self
                .orders
                .lock()
                .await
                .values()
                .find(|o| o.order_number == order_number)
                .cloned())
        }

        async fn find_by_tracking_id(&self, tracking_id: &str) -> Result<Option<Order>, BoxError> {
            Ok(self
                .orders
                .lock()
                .await
                .values()
                .find(|o| o.pesapal_tracking_id.as_deref() == Some(tracking_id))
                .cloned())
        }

        async fn attach_gateway_refs(
            &self,
            id: i64,
            tracking_id: &str,
            merchant_reference: &str,
        ) -> Result<(), BoxError> {
            let mut orders = self.orders.lock().await;
            let order = orders.get_mut(&id).ok_or("order not found")?;
            order.pesapal_tracking_id = Some(tracking_id.to_string());
            order.pesapal_merchant_reference = Some(merchant_reference.to_string());
            Ok(())
        }

        async fn mark_paid_if_unpaid(&self, id: i64, paid_at: i64) -> Result<bool, BoxError> {
            let mut orders = self.orders.lock().await;
            let order = orders.get_mut(&id).ok_or("order not found")?;
            if order.status == OrderStatus::Pending.as_db() {
                order.status = OrderStatus::Paid.as_db().to_string();
                order.paid_at = Some(paid_at);
                Ok(true)
            } else {
                Ok(false)
            }
        }

        async fn items_for(&self, order_id: i64) -> Result<Vec<OrderItem>, BoxError> {
            Ok(test_items(order_id))
        }
    }

    /// Gateway stub with a scripted status response
    struct StubGateway {
        status: Result<Option<&'static str>, &'static str>,
        submit: Result<(), &'static str>,
    }

    impl StubGateway {
        fn completed() -> Arc<Self> {
            Arc::new(Self {
                status: Ok(Some("Completed")),
                submit: Ok(()),
            })
        }

        fn with_status(desc: &'static str) -> Arc<Self> {
            Arc::new(Self {
                status: Ok(Some(desc)),
                submit: Ok(()),
            })
        }

        fn status_failing() -> Arc<Self> {
            Arc::new(Self {
                status: Err("connection reset"),
                submit: Ok(()),
            })
        }

        fn submit_failing() -> Arc<Self> {
            Arc::new(Self {
                status: Ok(None),
                submit: Err("provider returned 500"),
            })
        }
    }

    #[async_trait]
    impl PaymentGateway for StubGateway {
        async fn submit_order(&self, order: &Order) -> Result<GatewaySubmission, GatewayError> {
            match self.submit {
                Ok(()) => Ok(GatewaySubmission {
                    order_tracking_id: format!("trk-{}", order.id),
                    merchant_reference: order.order_number.clone(),
                    redirect_url: "https://pay.example.com/redirect".into(),
                }),
                Err(msg) => Err(GatewayError::Submit(msg.into())),
            }
        }

        async fn transaction_status(
            &self,
            _tracking_id: &str,
        ) -> Result<TransactionStatus, GatewayError> {
            match self.status {
                Ok(desc) => Ok(TransactionStatus {
                    payment_status_description: desc.map(str::to_string),
                    raw: serde_json::Value::Null,
                }),
                Err(msg) => Err(GatewayError::Status(msg.into())),
            }
        }
    }

    /// Notifier fake counting dispatches
    #[derive(Default)]
    struct RecordingNotifier {
        confirmed: AtomicUsize,
        status_changes: AtomicUsize,
        fail: bool,
    }

    impl RecordingNotifier {
        fn arc() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                ..Self::default()
            })
        }

        fn confirmations(&self) -> usize {
            self.confirmed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn payment_confirmed(
            &self,
            _order: &Order,
            _items: &[OrderItem],
        ) -> Result<(), BoxError> {
            self.confirmed.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err("smtp down".into());
            }
            Ok(())
        }

        async fn status_changed(
            &self,
            _order: &Order,
            _status: OrderStatus,
        ) -> Result<(), BoxError> {
            self.status_changes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn reconciler(
        store: &Arc<MemoryStore>,
        gateway: Arc<StubGateway>,
        notifier: &Arc<RecordingNotifier>,
    ) -> Reconciler {
        Reconciler::new(store.clone(), gateway, notifier.clone())
    }

    // ── initiate_payment ────────────────────────────────────────────────

    #[tokio::test]
    async fn test_initiate_attaches_refs_and_keeps_pending() {
        let store = MemoryStore::with_order(test_order(1, "ORD-AAA", None));
        let notifier = RecordingNotifier::arc();
        let r = reconciler(&store, StubGateway::completed(), &notifier);

        let redirect = r.initiate_payment(1).await.unwrap();
        assert_eq!(redirect, "https://pay.example.com/redirect");

        let order = store.order(1).await;
        assert_eq!(order.status, "pending");
        assert_eq!(order.pesapal_tracking_id.as_deref(), Some("trk-1"));
        assert_eq!(order.pesapal_merchant_reference.as_deref(), Some("ORD-AAA"));
        assert_eq!(order.paid_at, None);
    }

    #[tokio::test]
    async fn test_initiate_unknown_order() {
        let store = MemoryStore::with_order(test_order(1, "ORD-AAA", None));
        let notifier = RecordingNotifier::arc();
        let r = reconciler(&store, StubGateway::completed(), &notifier);

        assert!(matches!(
            r.initiate_payment(99).await,
            Err(ReconcileError::OrderNotFound)
        ));
    }

    #[tokio::test]
    async fn test_initiate_gateway_failure_leaves_order_untouched() {
        let store = MemoryStore::with_order(test_order(1, "ORD-AAA", None));
        let notifier = RecordingNotifier::arc();
        let r = reconciler(&store, StubGateway::submit_failing(), &notifier);

        assert!(matches!(
            r.initiate_payment(1).await,
            Err(ReconcileError::Gateway(GatewayError::Submit(_)))
        ));

        let order = store.order(1).await;
        assert_eq!(order.status, "pending");
        assert_eq!(order.pesapal_tracking_id, None);
        assert_eq!(order.pesapal_merchant_reference, None);
    }

    #[tokio::test]
    async fn test_initiate_retry_overwrites_refs() {
        let store = MemoryStore::with_order(test_order(1, "ORD-AAA", Some("trk-old")));
        let notifier = RecordingNotifier::arc();
        let r = reconciler(&store, StubGateway::completed(), &notifier);

        r.initiate_payment(1).await.unwrap();
        let order = store.order(1).await;
        assert_eq!(order.pesapal_tracking_id.as_deref(), Some("trk-1"));
    }

    // ── reconcile ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let store = MemoryStore::with_order(test_order(1, "ORD-AAA", Some("trk-1")));
        let notifier = RecordingNotifier::arc();
        let r = reconciler(&store, StubGateway::completed(), &notifier);

        let first = r.reconcile("trk-1", Some("ORD-AAA")).await.unwrap();
        assert!(first.transitioned);
        assert_eq!(first.payment_status, "Completed");

        let paid_at = store.order(1).await.paid_at;
        assert!(paid_at.is_some());

        // Provider webhook retry: same status, must be a complete no-op
        let second = r.reconcile("trk-1", Some("ORD-AAA")).await.unwrap();
        assert!(!second.transitioned);

        let order = store.order(1).await;
        assert_eq!(order.status, "paid");
        assert_eq!(order.paid_at, paid_at, "paid_at must be written exactly once");
        assert_eq!(notifier.confirmations(), 1, "exactly one confirmation email");
    }

    #[tokio::test]
    async fn test_reconcile_never_regresses_paid() {
        let store = MemoryStore::with_order(test_order(1, "ORD-AAA", Some("trk-1")));
        let notifier = RecordingNotifier::arc();

        let r = reconciler(&store, StubGateway::completed(), &notifier);
        r.reconcile("trk-1", None).await.unwrap();
        let paid_at = store.order(1).await.paid_at;

        // A later query returns "Failed": status must stay paid
        let r = reconciler(&store, StubGateway::with_status("Failed"), &notifier);
        let outcome = r.reconcile("trk-1", None).await.unwrap();
        assert!(!outcome.transitioned);
        assert_eq!(outcome.payment_status, "Failed");

        let order = store.order(1).await;
        assert_eq!(order.status, "paid");
        assert_eq!(order.paid_at, paid_at);
        assert_eq!(notifier.confirmations(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_resolves_by_merchant_reference_alone() {
        // Tracking id on record differs from the one the caller presents
        let store = MemoryStore::with_order(test_order(1, "ORD-AAA", None));
        let notifier = RecordingNotifier::arc();
        let r = reconciler(&store, StubGateway::completed(), &notifier);

        let outcome = r.reconcile("trk-unknown", Some("ORD-AAA")).await.unwrap();
        assert!(outcome.transitioned);
        assert_eq!(store.order(1).await.status, "paid");
    }

    #[tokio::test]
    async fn test_reconcile_resolves_by_tracking_id_alone() {
        let store = MemoryStore::with_order(test_order(1, "ORD-AAA", Some("trk-1")));
        let notifier = RecordingNotifier::arc();
        let r = reconciler(&store, StubGateway::completed(), &notifier);

        // Wrong reference, valid tracking id
        let outcome = r.reconcile("trk-1", Some("ORD-WRONG")).await.unwrap();
        assert!(outcome.transitioned);

        // And with no reference at all
        let store = MemoryStore::with_order(test_order(2, "ORD-BBB", Some("trk-2")));
        let r = reconciler(&store, StubGateway::completed(), &notifier);
        let outcome = r.reconcile("trk-2", None).await.unwrap();
        assert!(outcome.transitioned);
    }

    #[tokio::test]
    async fn test_reconcile_unknown_identifiers() {
        let store = MemoryStore::with_order(test_order(1, "ORD-AAA", Some("trk-1")));
        let notifier = RecordingNotifier::arc();
        let r = reconciler(&store, StubGateway::completed(), &notifier);

        assert!(matches!(
            r.reconcile("trk-nope", Some("ORD-NOPE")).await,
            Err(ReconcileError::OrderNotFound)
        ));
        assert_eq!(notifier.confirmations(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_non_success_is_no_op() {
        let store = MemoryStore::with_order(test_order(1, "ORD-AAA", Some("trk-1")));
        let notifier = RecordingNotifier::arc();
        let r = reconciler(&store, StubGateway::with_status("Pending"), &notifier);

        let outcome = r.reconcile("trk-1", Some("ORD-AAA")).await.unwrap();
        assert!(!outcome.transitioned);
        assert_eq!(outcome.payment_status, "Pending");

        let order = store.order(1).await;
        assert_eq!(order.status, "pending");
        assert_eq!(order.paid_at, None);
        assert_eq!(notifier.confirmations(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_gateway_failure_surfaces_without_mutation() {
        let store = MemoryStore::with_order(test_order(1, "ORD-AAA", Some("trk-1")));
        let notifier = RecordingNotifier::arc();
        let r = reconciler(&store, StubGateway::status_failing(), &notifier);

        assert!(matches!(
            r.reconcile("trk-1", Some("ORD-AAA")).await,
            Err(ReconcileError::Gateway(GatewayError::Status(_)))
        ));
        assert_eq!(store.order(1).await.status, "pending");
        assert_eq!(notifier.confirmations(), 0);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_roll_back_payment() {
        let store = MemoryStore::with_order(test_order(1, "ORD-AAA", Some("trk-1")));
        let notifier = RecordingNotifier::failing();
        let r = reconciler(&store, StubGateway::completed(), &notifier);

        let outcome = r.reconcile("trk-1", Some("ORD-AAA")).await.unwrap();
        assert!(outcome.transitioned, "email failure must not fail the transition");
        assert_eq!(store.order(1).await.status, "paid");
    }

    #[tokio::test]
    async fn test_concurrent_reconciles_notify_exactly_once() {
        let store = MemoryStore::with_order(test_order(1, "ORD-AAA", Some("trk-1")));
        let notifier = RecordingNotifier::arc();
        let r = Arc::new(reconciler(&store, StubGateway::completed(), &notifier));

        // IPN callback and verify polls racing on the same order
        let mut handles = Vec::new();
        for _ in 0..8 {
            let r = r.clone();
            handles.push(tokio::spawn(async move {
                r.reconcile("trk-1", Some("ORD-AAA")).await.unwrap()
            }));
        }

        let mut transitions = 0;
        for handle in handles {
            if handle.await.unwrap().transitioned {
                transitions += 1;
            }
        }

        assert_eq!(transitions, 1, "exactly one caller wins the transition");
        assert_eq!(notifier.confirmations(), 1);
        assert_eq!(store.order(1).await.status, "paid");
    }
}
