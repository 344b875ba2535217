//! Database layer
//!
//! Plain async query functions per table, grouped by module. Row structs
//! derive `sqlx::FromRow`; all money columns are NUMERIC mapped to
//! `rust_decimal::Decimal`. Timestamps are epoch milliseconds (`BIGINT`).

pub mod admin_users;
pub mod orders;
pub mod paintings;
pub mod regions;
