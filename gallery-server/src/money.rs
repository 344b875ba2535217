//! Money calculation utilities using rust_decimal for precision
//!
//! All monetary amounts are `Decimal` end-to-end (NUMERIC columns in
//! Postgres); rounding is 2 decimal places, half-up.

use rust_decimal::{Decimal, RoundingStrategy};
use shared::error::{AppError, ErrorCode};

/// Rounding for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed price per item
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Maximum allowed quantity per order item
pub const MAX_QUANTITY: i32 = 9999;

/// Round a monetary value to 2 decimal places, half-up
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Line subtotal: unit price x quantity, rounded
pub fn line_subtotal(price: Decimal, quantity: i32) -> Decimal {
    round_money(price * Decimal::from(quantity))
}

/// A checkout line as submitted by the client
#[derive(Debug, Clone)]
pub struct CheckoutLine {
    pub price: Decimal,
    pub quantity: i32,
}

/// Validate the monetary invariants of a checkout submission:
/// all amounts non-negative, quantities >= 1, sum of line subtotals equals
/// the declared subtotal, and subtotal + shipping equals the declared total.
pub fn validate_order_money(
    lines: &[CheckoutLine],
    subtotal: Decimal,
    shipping_cost: Decimal,
    total: Decimal,
) -> Result<(), AppError> {
    if lines.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty));
    }
    if subtotal < Decimal::ZERO || shipping_cost < Decimal::ZERO || total < Decimal::ZERO {
        return Err(AppError::validation("Amounts must be non-negative"));
    }

    let mut computed = Decimal::ZERO;
    for line in lines {
        if line.quantity < 1 {
            return Err(AppError::validation("Item quantity must be at least 1"));
        }
        if line.quantity > MAX_QUANTITY {
            return Err(AppError::validation(format!(
                "Item quantity exceeds maximum allowed ({MAX_QUANTITY})"
            )));
        }
        if line.price < Decimal::ZERO {
            return Err(AppError::validation("Item price must be non-negative"));
        }
        if line.price > MAX_PRICE {
            return Err(AppError::validation("Item price exceeds maximum allowed"));
        }
        computed += line_subtotal(line.price, line.quantity);
    }

    if round_money(computed) != round_money(subtotal) {
        return Err(AppError::validation(format!(
            "Subtotal mismatch: items sum to {computed}, got {subtotal}"
        )));
    }
    if round_money(subtotal + shipping_cost) != round_money(total) {
        return Err(AppError::validation(format!(
            "Total mismatch: expected {}, got {total}",
            subtotal + shipping_cost
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn test_decimal_precision() {
        // Classic floating point problem: 0.1 + 0.2 != 0.3 in f64,
        // but Decimal sums exactly.
        let a = Decimal::from_f64(0.1).unwrap();
        let b = Decimal::from_f64(0.2).unwrap();
        assert_eq!(a + b, Decimal::from_f64(0.3).unwrap());
    }

    #[test]
    fn test_accumulation_precision() {
        // Sum 0.01 one thousand times
        let cent = Decimal::new(1, 2);
        let mut total = Decimal::ZERO;
        for _ in 0..1000 {
            total += cent;
        }
        assert_eq!(total, dec(10));
    }

    #[test]
    fn test_rounding_half_up() {
        assert_eq!(round_money(Decimal::new(5, 3)), Decimal::new(1, 2)); // 0.005 -> 0.01
        assert_eq!(round_money(Decimal::new(4, 3)), Decimal::ZERO); // 0.004 -> 0.00
    }

    #[test]
    fn test_line_subtotal() {
        assert_eq!(line_subtotal(Decimal::new(1099, 2), 3), Decimal::new(3297, 2));
        assert_eq!(line_subtotal(dec(1000), 2), dec(2000));
    }

    #[test]
    fn test_checkout_scenario() {
        // items [{price 1000, qty 2}], shipping 500 -> subtotal 2000, total 2500
        let lines = vec![CheckoutLine {
            price: dec(1000),
            quantity: 2,
        }];
        assert!(validate_order_money(&lines, dec(2000), dec(500), dec(2500)).is_ok());
    }

    #[test]
    fn test_empty_order_rejected() {
        let err = validate_order_money(&[], dec(0), dec(0), dec(0)).unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderEmpty);
    }

    #[test]
    fn test_subtotal_mismatch_rejected() {
        let lines = vec![CheckoutLine {
            price: dec(1000),
            quantity: 2,
        }];
        assert!(validate_order_money(&lines, dec(1999), dec(500), dec(2499)).is_err());
    }

    #[test]
    fn test_total_mismatch_rejected() {
        let lines = vec![CheckoutLine {
            price: dec(1000),
            quantity: 2,
        }];
        assert!(validate_order_money(&lines, dec(2000), dec(500), dec(2600)).is_err());
    }

    #[test]
    fn test_negative_amounts_rejected() {
        let lines = vec![CheckoutLine {
            price: dec(-10),
            quantity: 1,
        }];
        assert!(validate_order_money(&lines, dec(-10), dec(0), dec(-10)).is_err());

        let lines = vec![CheckoutLine {
            price: dec(10),
            quantity: 1,
        }];
        assert!(validate_order_money(&lines, dec(10), dec(-5), dec(5)).is_err());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let lines = vec![CheckoutLine {
            price: dec(10),
            quantity: 0,
        }];
        assert!(validate_order_money(&lines, dec(0), dec(0), dec(0)).is_err());
    }

    #[test]
    fn test_fractional_prices_sum_exactly() {
        // 3 x 33.33 = 99.99, no drift
        let lines = vec![CheckoutLine {
            price: Decimal::new(3333, 2),
            quantity: 3,
        }];
        assert!(
            validate_order_money(
                &lines,
                Decimal::new(9999, 2),
                Decimal::new(1, 2),
                Decimal::new(10000, 2)
            )
            .is_ok()
        );
    }
}
