//! Price comparison.
//!
//! Prices travel as JSON numbers between services, so totals are compared with
//! an absolute tolerance instead of exact equality.

/// Largest absolute difference at which two amounts are considered equal.
pub const PRICE_TOLERANCE: f64 = 0.0001;

/// Returns true if `a` and `b` differ by no more than [`PRICE_TOLERANCE`].
pub fn amounts_match(a: f64, b: f64) -> bool {
    (a - b).abs() <= PRICE_TOLERANCE
}
