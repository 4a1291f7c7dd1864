//! Integer ceiling-division helpers shared by the wire codec and the delay
//! calculus. All reservation arithmetic is defined over non-negative
//! integers rounded toward +infinity, never truncated.

/// `ceil(numerator / denominator)` for non-negative integers.
///
/// Panics if `denominator` is zero; every call site in this crate divides by
/// a stream's `burst_interval` or the configured link speed, both of which
/// are validated to be positive before a `Reservation` or `Config` is built.
pub fn ceil_div_u64(numerator: u64, denominator: u64) -> u64 {
    assert!(denominator != 0, "division by zero in ceil_div_u64");
    (numerator + denominator - 1) / denominator
}

/// `ceil(numerator / denominator)` widened to `u128`, for products that can
/// legitimately exceed `u64` (e.g. a bit count times `1_000_000`) before
/// being scaled back down. Panics if `denominator` is zero, for the same
/// reason as [`ceil_div_u64`].
pub fn ceil_div_u128(numerator: u128, denominator: u128) -> u128 {
    assert!(denominator != 0, "division by zero in ceil_div_u128");
    (numerator + denominator - 1) / denominator
}
