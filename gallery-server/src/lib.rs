//! Gallery storefront backend
//!
//! # Architecture
//!
//! ```text
//! gallery-server/src/
//! ├── config.rs      # env-driven configuration
//! ├── state.rs       # AppState: pool, notifier, reconciler
//! ├── db/            # sqlx/PostgreSQL query modules
//! ├── payments/      # PesaPal client + order-payment reconciler
//! ├── email/         # SES notifier (fire-and-forget)
//! ├── auth/          # admin JWT + argon2
//! └── api/           # axum routes (public + admin)
//! ```
//!
//! The core is the order-payment reconciliation state machine in
//! [`payments::reconciler`]: order creation reserves stock, payment runs on
//! the provider's hosted page, and both completion signals (IPN callback,
//! browser verify poll) funnel into one idempotent `reconcile` operation.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod money;
pub mod payments;
pub mod state;
pub mod validation;

pub use config::Config;
pub use state::AppState;
