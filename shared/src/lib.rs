//! Shared types for the gallery storefront
//!
//! Common types used by the server and its clients: the unified error
//! system, the API response envelope, and order/payment domain enums.

pub mod error;
pub mod models;

// Re-exports
pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use models::order::OrderStatus;
