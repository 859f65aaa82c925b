//! Money calculation utilities using rust_decimal for precision
//!
//! All arithmetic is done in `Decimal`, then converted back to `f64`
//! for storage/serialization. Two decimal places, half-up.

use rust_decimal::prelude::*;

const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: f64 = 0.01;

/// Maximum allowed unit price
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per item
const MAX_QUANTITY: i64 = 9999;

/// Round a monetary value to 2 decimal places, half-up
pub fn round_money(value: f64) -> f64 {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// line total = unit_price * quantity
pub fn line_total(unit_price: f64, quantity: i64) -> f64 {
    let price = Decimal::from_f64(unit_price).unwrap_or_default();
    let qty = Decimal::from(quantity);
    (price * qty)
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}

/// Compute (subtotal, total) from item lines and the shipping fee.
///
/// total = subtotal + shipping_fee, always.
pub fn compute_totals(lines: &[(f64, i64)], shipping_fee: f64) -> (f64, f64) {
    let subtotal = lines
        .iter()
        .fold(Decimal::ZERO, |acc, (price, qty)| {
            acc + Decimal::from_f64(*price).unwrap_or_default() * Decimal::from(*qty)
        })
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
    let total = (subtotal + Decimal::from_f64(shipping_fee).unwrap_or_default())
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
    (
        subtotal.to_f64().unwrap_or(0.0),
        total.to_f64().unwrap_or(0.0),
    )
}

/// Two amounts are equal within monetary tolerance
pub fn amounts_match(a: f64, b: f64) -> bool {
    (a - b).abs() < MONEY_TOLERANCE
}

/// Validate a unit price: finite, non-negative, bounded
pub fn validate_price(price: f64) -> Result<(), String> {
    if !price.is_finite() {
        return Err(format!("price must be a finite number, got {price}"));
    }
    if price < 0.0 {
        return Err(format!("price must be non-negative, got {price}"));
    }
    if price > MAX_PRICE {
        return Err(format!(
            "price exceeds maximum allowed ({MAX_PRICE}), got {price}"
        ));
    }
    Ok(())
}

/// Validate an item quantity: positive, bounded
pub fn validate_quantity(quantity: i64) -> Result<(), String> {
    if quantity <= 0 {
        return Err(format!("quantity must be positive, got {quantity}"));
    }
    if quantity > MAX_QUANTITY {
        return Err(format!(
            "quantity exceeds maximum allowed ({MAX_QUANTITY}), got {quantity}"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_are_subtotal_plus_shipping() {
        let (subtotal, total) = compute_totals(&[(19.99, 2), (5.0, 1)], 4.5);
        assert_eq!(subtotal, 44.98);
        assert_eq!(total, 49.48);
    }

    #[test]
    fn empty_cart_totals_are_shipping_only() {
        let (subtotal, total) = compute_totals(&[], 10.0);
        assert_eq!(subtotal, 0.0);
        assert_eq!(total, 10.0);
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(round_money(1.005), 1.01);
        assert_eq!(round_money(1.004), 1.0);
        assert_eq!(line_total(0.1, 3), 0.3);
    }

    #[test]
    fn amount_comparison_uses_tolerance() {
        assert!(amounts_match(10.0, 10.004));
        assert!(!amounts_match(10.0, 10.02));
    }

    #[test]
    fn price_and_quantity_validation() {
        assert!(validate_price(0.0).is_ok());
        assert!(validate_price(-1.0).is_err());
        assert!(validate_price(f64::NAN).is_err());
        assert!(validate_price(2_000_000.0).is_err());
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(10_000).is_err());
    }
}
