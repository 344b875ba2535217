//! PesaPal gateway client (REST API, no SDK dependency)
//!
//! Wraps the four provider operations behind [`PaymentGateway`]:
//! token request, IPN registration, order submission, and transaction
//! status. The token and IPN-registration results are cached process-wide;
//! the token TTL (240 s) is deliberately shorter than the provider-side
//! expiry (300 s) so a cached token never expires mid-flight. Fetching a
//! token twice under a cache-miss race is harmless.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::orders::Order;

/// The only provider status treated as terminal success
pub const STATUS_COMPLETED: &str = "Completed";

/// Token cache TTL; provider tokens expire after 5 minutes
const TOKEN_TTL: Duration = Duration::from_secs(240);

/// IPN registration cache TTL; re-registering is provider-accepted but
/// the registration rarely changes
const IPN_TTL: Duration = Duration::from_secs(86_400);

/// Request timeout for all provider calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Typed gateway failures; never auto-retried by this client
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway authentication failed: {0}")]
    Auth(String),
    #[error("gateway order submission failed: {0}")]
    Submit(String),
    #[error("gateway status query failed: {0}")]
    Status(String),
}

/// Result of a successful order submission
#[derive(Debug, Clone)]
pub struct GatewaySubmission {
    pub order_tracking_id: String,
    pub merchant_reference: String,
    pub redirect_url: String,
}

/// Provider transaction status payload
#[derive(Debug, Clone)]
pub struct TransactionStatus {
    /// `payment_status_description`: "Completed", "Failed", "Reversed",
    /// "Pending", or absent
    pub payment_status_description: Option<String>,
    /// Raw provider payload, kept for logging
    pub raw: serde_json::Value,
}

impl TransactionStatus {
    /// Only the literal "Completed" is terminal success; every other value
    /// (including absent) is non-final.
    pub fn is_completed(&self) -> bool {
        self.payment_status_description.as_deref() == Some(STATUS_COMPLETED)
    }
}

/// External payment provider seam used by the reconciler
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Submit an order, returning the hosted-payment redirect and the
    /// provider correlation identifiers.
    async fn submit_order(&self, order: &Order) -> Result<GatewaySubmission, GatewayError>;

    /// Query the current transaction status for a tracking id.
    async fn transaction_status(&self, tracking_id: &str)
    -> Result<TransactionStatus, GatewayError>;
}

/// Single-slot TTL cache with an explicit clock, shared process-wide
/// behind the client's `Arc`.
pub struct TtlCache {
    slot: RwLock<Option<CachedValue>>,
    ttl: Duration,
}

struct CachedValue {
    value: String,
    expires_at: Instant,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl,
        }
    }

    /// Return the cached value if it has not expired
    pub async fn get(&self) -> Option<String> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|cached| cached.expires_at > Instant::now())
            .map(|cached| cached.value.clone())
    }

    /// Store a value, stamping it with the configured TTL
    pub async fn put(&self, value: String) {
        let mut slot = self.slot.write().await;
        *slot = Some(CachedValue {
            value,
            expires_at: Instant::now() + self.ttl,
        });
    }

    /// Drop the cached value
    pub async fn clear(&self) {
        *self.slot.write().await = None;
    }
}

/// PesaPal API v3 client
pub struct PesapalClient {
    http: reqwest::Client,
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
    ipn_url: String,
    callback_url: String,
    currency: String,
    token_cache: TtlCache,
    ipn_cache: TtlCache,
}

impl PesapalClient {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: config.pesapal_base_url.clone(),
            consumer_key: config.pesapal_consumer_key.clone(),
            consumer_secret: config.pesapal_consumer_secret.clone(),
            ipn_url: config.pesapal_ipn_url.clone(),
            callback_url: config.pesapal_callback_url.clone(),
            currency: config.currency.clone(),
            token_cache: TtlCache::new(TOKEN_TTL),
            ipn_cache: TtlCache::new(IPN_TTL),
        }
    }

    /// Get a bearer token, from cache when fresh
    async fn access_token(&self) -> Result<String, GatewayError> {
        if let Some(token) = self.token_cache.get().await {
            return Ok(token);
        }

        let resp = self
            .http
            .post(format!("{}/api/Auth/RequestToken", self.base_url))
            .json(&serde_json::json!({
                "consumer_key": self.consumer_key,
                "consumer_secret": self.consumer_secret,
            }))
            .send()
            .await
            .map_err(|e| GatewayError::Auth(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(GatewayError::Auth(format!(
                "provider returned {}",
                resp.status()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::Auth(e.to_string()))?;

        let token = body["token"]
            .as_str()
            .ok_or_else(|| GatewayError::Auth(format!("no token in response: {body}")))?
            .to_string();

        self.token_cache.put(token.clone()).await;
        Ok(token)
    }

    /// Register our IPN callback URL; idempotent provider-side, cached
    /// locally for a day
    async fn registered_ipn_id(&self) -> Result<String, GatewayError> {
        if let Some(ipn_id) = self.ipn_cache.get().await {
            return Ok(ipn_id);
        }

        let token = self.access_token().await?;
        let resp = self
            .http
            .post(format!("{}/api/URLSetup/RegisterIPN", self.base_url))
            .bearer_auth(&token)
            .json(&serde_json::json!({
                "url": self.ipn_url,
                "ipn_notification_type": "GET",
            }))
            .send()
            .await
            .map_err(|e| GatewayError::Submit(format!("IPN registration failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(GatewayError::Submit(format!(
                "IPN registration returned {}",
                resp.status()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::Submit(format!("IPN registration failed: {e}")))?;

        let ipn_id = body["ipn_id"]
            .as_str()
            .ok_or_else(|| GatewayError::Submit(format!("no ipn_id in response: {body}")))?
            .to_string();

        self.ipn_cache.put(ipn_id.clone()).await;
        Ok(ipn_id)
    }
}

/// Split a full name into the provider's first/last billing fields
fn split_customer_name(name: &str) -> (String, String) {
    let mut parts = name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

#[async_trait]
impl PaymentGateway for PesapalClient {
    async fn submit_order(&self, order: &Order) -> Result<GatewaySubmission, GatewayError> {
        let token = self.access_token().await?;
        let ipn_id = self.registered_ipn_id().await?;
        let (first_name, last_name) = split_customer_name(&order.customer_name);

        let resp = self
            .http
            .post(format!(
                "{}/api/Transactions/SubmitOrderRequest",
                self.base_url
            ))
            .bearer_auth(&token)
            .json(&serde_json::json!({
                "id": order.order_number,
                "currency": self.currency,
                "amount": order.total.to_f64().unwrap_or_default(),
                "description": "Gallery artwork order",
                "callback_url": format!("{}?order={}", self.callback_url, order.order_number),
                "notification_id": ipn_id,
                "billing_address": {
                    "email_address": order.customer_email,
                    "phone_number": order.customer_phone,
                    "first_name": first_name,
                    "last_name": last_name,
                },
            }))
            .send()
            .await
            .map_err(|e| GatewayError::Submit(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(GatewayError::Submit(format!(
                "provider returned {}",
                resp.status()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::Submit(e.to_string()))?;

        let order_tracking_id = body["order_tracking_id"]
            .as_str()
            .ok_or_else(|| GatewayError::Submit(format!("no order_tracking_id: {body}")))?
            .to_string();
        let merchant_reference = body["merchant_reference"]
            .as_str()
            .unwrap_or(&order.order_number)
            .to_string();
        let redirect_url = body["redirect_url"]
            .as_str()
            .ok_or_else(|| GatewayError::Submit(format!("no redirect_url: {body}")))?
            .to_string();

        Ok(GatewaySubmission {
            order_tracking_id,
            merchant_reference,
            redirect_url,
        })
    }

    async fn transaction_status(
        &self,
        tracking_id: &str,
    ) -> Result<TransactionStatus, GatewayError> {
        let token = self.access_token().await?;

        let resp = self
            .http
            .get(format!(
                "{}/api/Transactions/GetTransactionStatus",
                self.base_url
            ))
            .bearer_auth(&token)
            .query(&[("orderTrackingId", tracking_id)])
            .send()
            .await
            .map_err(|e| GatewayError::Status(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(GatewayError::Status(format!(
                "provider returned {}",
                resp.status()
            )));
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::Status(e.to_string()))?;

        let payment_status_description = raw["payment_status_description"]
            .as_str()
            .map(str::to_string);

        Ok(TransactionStatus {
            payment_status_description,
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_returns_fresh_value() {
        let cache = TtlCache::new(Duration::from_secs(60));
        assert_eq!(cache.get().await, None);

        cache.put("token-1".into()).await;
        assert_eq!(cache.get().await, Some("token-1".into()));
    }

    #[tokio::test]
    async fn test_cache_expires() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.put("token-1".into()).await;
        assert_eq!(cache.get().await, None, "zero TTL must expire immediately");
    }

    #[tokio::test]
    async fn test_cache_overwrite_and_clear() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.put("token-1".into()).await;
        cache.put("token-2".into()).await;
        assert_eq!(cache.get().await, Some("token-2".into()));

        cache.clear().await;
        assert_eq!(cache.get().await, None);
    }

    #[test]
    fn test_split_customer_name() {
        assert_eq!(
            split_customer_name("Jane Doe"),
            ("Jane".into(), "Doe".into())
        );
        assert_eq!(
            split_customer_name("Jane Middle Doe"),
            ("Jane".into(), "Middle Doe".into())
        );
        assert_eq!(split_customer_name("Jane"), ("Jane".into(), String::new()));
        assert_eq!(split_customer_name(""), (String::new(), String::new()));
    }

    #[test]
    fn test_completed_is_the_only_success_marker() {
        let status = |desc: Option<&str>| TransactionStatus {
            payment_status_description: desc.map(str::to_string),
            raw: serde_json::Value::Null,
        };

        assert!(status(Some("Completed")).is_completed());
        assert!(!status(Some("Failed")).is_completed());
        assert!(!status(Some("Reversed")).is_completed());
        assert!(!status(Some("Pending")).is_completed());
        // Case-sensitive by contract
        assert!(!status(Some("completed")).is_completed());
        assert!(!status(None).is_completed());
    }
}
