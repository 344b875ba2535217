//! Order status lifecycle
//!
//! The `status` column is written by two independent actors: the payment
//! reconciler (system-driven `pending -> paid`) and admin fulfillment edits
//! (operator-driven). The transition table below makes the split explicit
//! and rejects nonsensical manual edits (e.g. `delivered -> pending`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// The single supported payment gateway identifier
pub const PAYMENT_METHOD: &str = "pesapal";

/// Order lifecycle status
///
/// `pending` is the only valid initial state. `pending -> paid` is the
/// system-driven transition applied by the payment reconciler; everything
/// after `paid` is operator-driven fulfillment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Database/wire representation
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the database/wire representation
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "processing" => Some(Self::Processing),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Position along the fulfillment chain (paid -> processing -> shipped
    /// -> delivered); `None` for states outside the chain.
    fn fulfillment_rank(&self) -> Option<u8> {
        match self {
            Self::Paid => Some(0),
            Self::Processing => Some(1),
            Self::Shipped => Some(2),
            Self::Delivered => Some(3),
            Self::Pending | Self::Cancelled => None,
        }
    }

    /// Whether an operator may manually change an order from `self` to `to`.
    ///
    /// Allowed:
    /// - `pending -> paid` (goes through the same idempotent mark-paid guard
    ///   as the reconciler, so `paid_at` is still set exactly once)
    /// - forward moves along `paid -> processing -> shipped -> delivered`,
    ///   skipping ahead allowed
    /// - any non-terminal state `-> cancelled`
    ///
    /// Rejected: self-transitions, anything `-> pending`, backward moves,
    /// and any transition out of a terminal state.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        if *self == to || self.is_terminal() {
            return false;
        }
        match to {
            Self::Pending => false,
            Self::Cancelled => true,
            Self::Paid => *self == Self::Pending,
            _ => match (self.fulfillment_rank(), to.fulfillment_rank()) {
                (Some(from), Some(target)) => target > from,
                _ => false,
            },
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn test_db_roundtrip() {
        for status in [Pending, Paid, Processing, Shipped, Delivered, Cancelled] {
            assert_eq!(OrderStatus::from_db(status.as_db()), Some(status));
        }
        assert_eq!(OrderStatus::from_db("refunded"), None);
    }

    #[test]
    fn test_serde_snake_case() {
        assert_eq!(serde_json::to_string(&Paid).unwrap(), "\"paid\"");
        let status: OrderStatus = serde_json::from_str("\"shipped\"").unwrap();
        assert_eq!(status, Shipped);
    }

    #[test]
    fn test_forward_fulfillment_allowed() {
        assert!(Pending.can_transition_to(Paid));
        assert!(Paid.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        // Skipping ahead is allowed
        assert!(Paid.can_transition_to(Shipped));
        assert!(Paid.can_transition_to(Delivered));
    }

    #[test]
    fn test_cancellation_from_non_terminal() {
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Paid.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(Shipped.can_transition_to(Cancelled));
    }

    #[test]
    fn test_backward_and_pending_rejected() {
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Paid.can_transition_to(Pending));
        assert!(!Shipped.can_transition_to(Processing));
        assert!(!Delivered.can_transition_to(Shipped));
        assert!(!Processing.can_transition_to(Paid));
    }

    #[test]
    fn test_terminal_states_locked() {
        assert!(!Cancelled.can_transition_to(Paid));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Delivered.can_transition_to(Cancelled));
    }

    #[test]
    fn test_pending_cannot_skip_payment() {
        assert!(!Pending.can_transition_to(Processing));
        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Pending.can_transition_to(Delivered));
    }

    #[test]
    fn test_self_transition_rejected() {
        for status in [Pending, Paid, Processing, Shipped, Delivered, Cancelled] {
            assert!(!status.can_transition_to(status));
        }
    }
}
