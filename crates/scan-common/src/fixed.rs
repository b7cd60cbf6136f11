//! Fixed-point rational arithmetic for edge bookkeeping.

/// A quotient and remainder of a division. Used to carry rational
/// x-coordinates along an edge without accumulating rounding error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuoRem {
    pub quo: i32,
    pub rem: i32,
}

/// Floored division `a/b`, remainder in `[0, b)` for `b > 0`.
///
/// Rust's `/` and `%` truncate toward zero; the pair is fixed up when the
/// operand signs disagree and the remainder is non-zero.
#[inline]
pub fn floored_divrem(a: i32, b: i32) -> QuoRem {
    let mut quo = a / b;
    let mut rem = a % b;
    if (a ^ b) < 0 && rem != 0 {
        quo -= 1;
        rem += b;
    }
    QuoRem { quo, rem }
}

/// Floored division `(x*a)/b` with a 64-bit product, for edge setup where
/// `x*a` can overflow 32 bits.
#[inline]
pub fn floored_muldivrem(x: i32, a: i32, b: i32) -> QuoRem {
    let xa = x as i64 * a as i64;
    let b64 = b as i64;
    let mut quo = xa / b64;
    let mut rem = xa % b64;
    if (xa >= 0) != (b >= 0) && rem != 0 {
        quo -= 1;
        rem += b64;
    }
    QuoRem {
        quo: quo as i32,
        rem: rem as i32,
    }
}
