//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Clamp a value into the range `[min, max]`.
///
/// A NaN value is passed through unchanged.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

/// Backward finite difference `(current - previous) / dt`.
///
/// Returns `None` if `dt` is not strictly positive, since the quotient would
/// be infinite, NaN, or refer to time running backwards.
pub fn backward_diff<T>(current: T, previous: T, dt: T) -> Option<T>
where
    T: Float
{
    if dt > T::zero() {
        Some((current - previous) / dt)
    }
    else {
        None
    }
}
