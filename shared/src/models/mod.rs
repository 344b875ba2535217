//! Domain model types shared between server and clients

pub mod order;

pub use order::{OrderStatus, PAYMENT_METHOD};
