use crate::{CoreError, CoreResult};

/// Absolute and relative tolerance for comparing simulated values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    pub abs: f64,
    pub rel: f64,
}

/// `a` and `b` agree within `tol.abs`, or within `tol.rel` of the larger
/// magnitude.
pub fn nearly_equal(a: f64, b: f64, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    diff <= tol.abs || diff <= tol.rel * a.abs().max(b.abs())
}

/// Pass `value` through, or name it in a [`CoreError::NonFinite`].
pub fn ensure_finite(value: f64, what: &'static str) -> CoreResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CoreError::NonFinite { what, value })
    }
}

/// Clamp `value` into `[min, max]`.
///
/// `max` is checked first, so an inverted range yields `max` or `min` instead
/// of the panic `f64::clamp` raises.
#[inline]
pub fn limit_value(value: f64, min: f64, max: f64) -> f64 {
    if value > max {
        max
    } else if value < min {
        min
    } else {
        value
    }
}

/// `value` limited from below.
#[inline]
pub fn low_limit(value: f64, min: f64) -> f64 {
    if value < min { min } else { value }
}

/// Derivative of [`low_limit`] with respect to `value`.
#[inline]
pub fn dx_low_limit(value: f64, min: f64) -> f64 {
    if value < min { 0.0 } else { 1.0 }
}
