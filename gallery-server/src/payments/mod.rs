//! Payment integration
//!
//! - [`pesapal`]: the gateway client (token cache, IPN registration,
//!   order submission, status query)
//! - [`reconciler`]: the order-payment state machine shared by the IPN
//!   callback and the verify-poll adapters

pub mod pesapal;
pub mod reconciler;

pub use pesapal::{GatewayError, PaymentGateway, PesapalClient};
pub use reconciler::{ReconcileError, ReconcileOutcome, Reconciler};
