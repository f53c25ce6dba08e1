//! Division, remainder, double bridging and decimal rendering for
//! [`WideInt`].
//!
//! The target host has no 64-bit integer division, so the general algorithm
//! is binary long division over the word pair. Doubles are used only where
//! exactness is provable: any magnitude whose top 21 bits are clear is below
//! 2^53 and round-trips losslessly through a double, so such operands take
//! an exact double fast path instead.

use std::cmp::Ordering;

use crate::error::ArithError;
use crate::wideint::WideInt;

pub(crate) const TWO_POW_32: f64 = 4_294_967_296.0;

/// High-word mask for the top 21 bits. When `hi & SAFE_HI_MASK == 0` the
/// unsigned value is below 2^53 and is exactly representable as a double.
pub(crate) const SAFE_HI_MASK: u32 = 0xffe0_0000;

/// 2^63 as a double; the smallest double not representable as a signed
/// 64-bit value.
const TWO_POW_63: f64 = 9.223372036854776e18;

fn is_unsigned_safe(v: WideInt) -> bool {
    v.hi() & SAFE_HI_MASK == 0
}

/// Reassemble the unsigned value as a double. Exact when the magnitude is
/// unsigned-safe; rounds to nearest otherwise.
pub(crate) fn unsigned_to_f64(v: WideInt) -> f64 {
    v.hi() as f64 * TWO_POW_32 + v.lo() as f64
}

/// Split a nonnegative integral double below 2^53 back into words.
fn from_unsigned_safe_f64(d: f64) -> WideInt {
    WideInt::from_words((d % TWO_POW_32) as u32, (d / TWO_POW_32) as u32)
}

fn leading_zeros(v: WideInt) -> u32 {
    if v.hi() != 0 {
        v.hi().leading_zeros()
    } else {
        32 + v.lo().leading_zeros()
    }
}

fn unsigned_abs(v: WideInt) -> WideInt {
    if v.is_negative() {
        -v
    } else {
        v
    }
}

/// Truncating conversion from a double, saturating at the 64-bit range.
pub(crate) fn from_f64(value: f64) -> WideInt {
    if value.is_nan() {
        return WideInt::ZERO;
    }
    if value < -TWO_POW_63 {
        return WideInt::MIN;
    }
    if value >= TWO_POW_63 {
        return WideInt::MAX;
    }
    let abs = value.abs().trunc();
    let words = WideInt::from_words((abs % TWO_POW_32) as u32, (abs / TWO_POW_32) as u32);
    if value < 0.0 {
        -words
    } else {
        words
    }
}

/// Signed truncating division; the quotient sign is the XOR of the operand
/// signs.
pub(crate) fn divide(a: WideInt, b: WideInt) -> Result<WideInt, ArithError> {
    if b.is_zero() {
        return Err(ArithError::DivideByZero);
    }
    let (quot, _) = divmod_unsigned(unsigned_abs(a), unsigned_abs(b));
    if a.is_negative() != b.is_negative() {
        Ok(-quot)
    } else {
        Ok(quot)
    }
}

/// Signed remainder; the result sign follows the dividend.
pub(crate) fn remainder(a: WideInt, b: WideInt) -> Result<WideInt, ArithError> {
    if b.is_zero() {
        return Err(ArithError::DivideByZero);
    }
    let (_, rem) = divmod_unsigned(unsigned_abs(a), unsigned_abs(b));
    if a.is_negative() {
        Ok(-rem)
    } else {
        Ok(rem)
    }
}

/// Unsigned quotient and remainder, `b` known nonzero.
///
/// Fast paths first: exact double arithmetic when both magnitudes fit 53
/// bits, shift/mask when the divisor is a power of two, and binary long
/// division only as the general case.
pub(crate) fn divmod_unsigned(a: WideInt, b: WideInt) -> (WideInt, WideInt) {
    if is_unsigned_safe(a) {
        if is_unsigned_safe(b) {
            let ad = unsigned_to_f64(a);
            let bd = unsigned_to_f64(b);
            (
                from_unsigned_safe_f64((ad / bd).trunc()),
                from_unsigned_safe_f64(ad % bd),
            )
        } else {
            // Divisor magnitude exceeds the dividend's.
            (WideInt::ZERO, a)
        }
    } else if b.hi() == 0 && b.lo().is_power_of_two() {
        let pow = b.lo().trailing_zeros();
        (a.lshr(pow), WideInt::from_words(a.lo() & (b.lo() - 1), 0))
    } else if b.lo() == 0 && b.hi().is_power_of_two() {
        let pow = b.hi().trailing_zeros();
        (a.lshr(32 + pow), WideInt::from_words(a.lo(), a.hi() & (b.hi() - 1)))
    } else {
        divmod_unsigned_general(a, b)
    }
}

/// Binary long division from the most significant bit down.
///
/// Subtracts the shifted divisor and sets quotient bits until the remaining
/// magnitude fits 53 bits, then finishes the residue through the exact
/// double path.
fn divmod_unsigned_general(a: WideInt, b: WideInt) -> (WideInt, WideInt) {
    let mut shift = leading_zeros(b) as i32 - leading_zeros(a) as i32;
    let mut b_shift = if shift >= 0 {
        b.shl(shift as u32)
    } else {
        WideInt::ZERO
    };
    let mut quot = WideInt::ZERO;
    let mut rem = a;

    while shift >= 0 && !is_unsigned_safe(rem) {
        if rem.cmp_unsigned(b_shift) != Ordering::Less {
            rem = rem - b_shift;
            quot = if shift < 32 {
                quot | WideInt::from_words(1 << shift, 0)
            } else {
                quot | WideInt::from_words(0, 1 << (shift - 32))
            };
        }
        shift -= 1;
        b_shift = b_shift.lshr(1);
    }

    // The remainder is now unsigned-safe; at most one more division is
    // needed, and it is exact in doubles. If b itself is not unsigned-safe
    // the remainder is already smaller than b.
    if rem.cmp_unsigned(b) != Ordering::Less {
        let rd = unsigned_to_f64(rem);
        let bd = unsigned_to_f64(b);
        quot = quot + from_unsigned_safe_f64((rd / bd).trunc());
        rem = from_unsigned_safe_f64(rd % bd);
    }
    (quot, rem)
}

/// Render an unsigned magnitude in decimal.
///
/// Magnitudes beyond 53 bits cannot be formatted through a double directly,
/// so one div/mod by 10^9 splits the value into a high digit group (always
/// unsigned-safe) and a low group of exactly nine digits.
pub(crate) fn unsigned_decimal(v: WideInt) -> String {
    if is_unsigned_safe(v) {
        format!("{}", unsigned_to_f64(v))
    } else {
        let (quot, rem) = divmod_unsigned(v, WideInt::from_words(1_000_000_000, 0));
        format!("{}{:09}", unsigned_to_f64(quot), rem.lo())
    }
}
