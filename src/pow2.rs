//! Power-of-two capacity rounding.

use crate::error::{Error, Result};

/// Returns the smallest power of two greater than or equal to `n`.
///
/// Evaluable in const context, so it can size fixed-length storage with
/// zero runtime cost:
///
/// ```
/// use hugering::pow2_ceil;
///
/// const CAP: usize = pow2_ceil(100);
/// assert_eq!(CAP, 128);
///
/// let buf = [0u8; pow2_ceil(5)];
/// assert_eq!(buf.len(), 8);
/// ```
///
/// Exact powers of two are fixed points: `pow2_ceil(16) == 16`.
///
/// # Panics
///
/// Panics when `n` is zero (zero has no power-of-two ceiling) and when no
/// power of two >= `n` fits in `usize`. In const context both surface as
/// compile errors. Use [`checked_pow2_ceil`] for runtime-provided sizes.
pub const fn pow2_ceil(n: usize) -> usize {
    assert!(n >= 1, "not a natural number");
    // Smear the most significant set bit of n - 1 into every lower bit;
    // the successor is then the next power of two, or n itself.
    let mut m = n - 1;
    let mut shift = 1;
    while shift < usize::BITS {
        m |= m >> shift;
        shift <<= 1;
    }
    // the successor overflows exactly when no power of two >= n fits,
    // and that must panic in every build profile
    match m.checked_add(1) {
        Some(p) => p,
        None => panic!("no representable power of two"),
    }
}

/// Fallible variant of [`pow2_ceil`].
///
/// # Errors
///
/// [`Error::NotNatural`] for `n == 0`, [`Error::Pow2Overflow`] when `n`
/// exceeds the largest power of two representable in `usize`.
pub fn checked_pow2_ceil(n: usize) -> Result<usize> {
    if n == 0 {
        return Err(Error::NotNatural);
    }
    if n > 1 << (usize::BITS - 1) {
        return Err(Error::Pow2Overflow(n));
    }
    Ok(pow2_ceil(n))
}
