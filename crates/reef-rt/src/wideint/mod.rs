//! Emulated 64-bit signed integers for the Reef runtime.
//!
//! Reef targets hosts whose only native numeric type is a 64-bit float and
//! whose bitwise operators work on 32-bit words. A `WideInt` is therefore a
//! pair of 32-bit words interpreted as one two's-complement 64-bit value,
//! and every operation here is written against that word representation --
//! the same algorithms the code generator emits -- so that constant folding
//! in the compiler and the conformance suite reproduce target results
//! bit for bit. Native `i64` appears only at the bridge points
//! ([`WideInt::from_i64`] / [`WideInt::to_i64`]) and in tests.
//!
//! Values are immutable: every operation returns a new `WideInt`. Addition,
//! subtraction and multiplication wrap on overflow; division and remainder
//! are the only fallible operations (see [`crate::error::ArithError`]).

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, BitAnd, BitOr, BitXor, Mul, Neg, Not, Sub};

use crate::error::ArithError;

pub(crate) mod math;

/// A 64-bit two's-complement integer stored as two 32-bit words.
///
/// The represented value is `hi * 2^32 + lo` with `lo` taken unsigned and
/// `hi` signed. Both words are always fully wrapped 32-bit quantities.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WideInt {
    lo: u32,
    hi: u32,
}

impl WideInt {
    pub const ZERO: WideInt = WideInt { lo: 0, hi: 0 };
    pub const ONE: WideInt = WideInt { lo: 1, hi: 0 };
    /// The most negative value, `-2^63`.
    pub const MIN: WideInt = WideInt { lo: 0, hi: 0x8000_0000 };
    /// The most positive value, `2^63 - 1`.
    pub const MAX: WideInt = WideInt { lo: 0xffff_ffff, hi: 0x7fff_ffff };

    /// Assemble a value from its raw low and high words.
    pub const fn from_words(lo: u32, hi: u32) -> WideInt {
        WideInt { lo, hi }
    }

    /// Sign-extend a native 32-bit integer.
    pub const fn from_i32(value: i32) -> WideInt {
        WideInt {
            lo: value as u32,
            hi: (value >> 31) as u32,
        }
    }

    /// Split a native 64-bit integer into words. Bridge entry point for the
    /// compiler; the arithmetic itself never goes through `i64`.
    pub const fn from_i64(value: i64) -> WideInt {
        WideInt {
            lo: value as u32,
            hi: (value >> 32) as u32,
        }
    }

    /// Truncating conversion from a double, clamped to the representable
    /// range: inputs below `-2^63` produce [`WideInt::MIN`], inputs at or
    /// above `2^63` produce [`WideInt::MAX`], and NaN produces zero.
    pub fn from_f64(value: f64) -> WideInt {
        math::from_f64(value)
    }

    /// The raw low word.
    pub const fn lo(self) -> u32 {
        self.lo
    }

    /// The raw high word.
    pub const fn hi(self) -> u32 {
        self.hi
    }

    /// Truncate to a native 32-bit integer (the low word).
    pub const fn to_i32(self) -> i32 {
        self.lo as i32
    }

    /// Reassemble the native 64-bit value.
    pub const fn to_i64(self) -> i64 {
        (((self.hi as u64) << 32) | self.lo as u64) as i64
    }

    /// Convert to a double, rounding to nearest once when the magnitude
    /// exceeds 53 bits.
    pub fn to_f64(self) -> f64 {
        if self.is_negative() {
            -math::unsigned_to_f64(-self)
        } else {
            math::unsigned_to_f64(self)
        }
    }

    /// Convert to a 32-bit float.
    ///
    /// Going through the double value naively would round twice (64 -> 53
    /// -> 24 bits) and can be off by one ulp. When the magnitude exceeds 53
    /// bits the low 16 bits are compressed to a sticky bit first, which
    /// makes the subsequent two roundings agree with a single correct
    /// rounding.
    pub fn to_f32(self) -> f32 {
        let neg = self.is_negative();
        let abs = if neg { -self } else { self };
        let compressed_lo = if abs.hi & math::SAFE_HI_MASK == 0 || abs.lo & 0xffff == 0 {
            abs.lo
        } else {
            0x8000 | (abs.lo & 0xffff_0000)
        };
        let abs_res = (abs.hi as f64) * math::TWO_POW_32 + compressed_lo as f64;
        (if neg { -abs_res } else { abs_res }) as f32
    }

    pub const fn is_zero(self) -> bool {
        self.lo == 0 && self.hi == 0
    }

    pub const fn is_negative(self) -> bool {
        (self.hi as i32) < 0
    }

    /// Logical left shift. The amount is taken modulo 64.
    pub fn shl(self, n: u32) -> WideInt {
        let n = n & 63;
        if n & 32 == 0 {
            WideInt {
                lo: self.lo << n,
                hi: ((self.lo >> 1) >> (31 - n)) | (self.hi << n),
            }
        } else {
            WideInt {
                lo: 0,
                hi: self.lo << (n & 31),
            }
        }
    }

    /// Logical (zero-filling) right shift. The amount is taken modulo 64.
    pub fn lshr(self, n: u32) -> WideInt {
        let n = n & 63;
        if n & 32 == 0 {
            WideInt {
                lo: (self.lo >> n) | ((self.hi << 1) << (31 - n)),
                hi: self.hi >> n,
            }
        } else {
            WideInt {
                lo: self.hi >> (n & 31),
                hi: 0,
            }
        }
    }

    /// Arithmetic (sign-filling) right shift. The amount is taken modulo 64.
    pub fn ashr(self, n: u32) -> WideInt {
        let n = n & 63;
        if n & 32 == 0 {
            WideInt {
                lo: (self.lo >> n) | ((self.hi << 1) << (31 - n)),
                hi: ((self.hi as i32) >> n) as u32,
            }
        } else {
            WideInt {
                lo: ((self.hi as i32) >> (n & 31)) as u32,
                hi: ((self.hi as i32) >> 31) as u32,
            }
        }
    }

    /// Signed truncating division. Fails when `rhs` is zero; `MIN / -1`
    /// wraps to `MIN`.
    pub fn div(self, rhs: WideInt) -> Result<WideInt, ArithError> {
        math::divide(self, rhs)
    }

    /// Signed remainder; the result carries the dividend's sign. Fails when
    /// `rhs` is zero.
    pub fn rem(self, rhs: WideInt) -> Result<WideInt, ArithError> {
        math::remainder(self, rhs)
    }

    /// Division treating both operands as unsigned 64-bit values.
    pub fn div_unsigned(self, rhs: WideInt) -> Result<WideInt, ArithError> {
        if rhs.is_zero() {
            return Err(ArithError::DivideByZero);
        }
        Ok(math::divmod_unsigned(self, rhs).0)
    }

    /// Remainder treating both operands as unsigned 64-bit values.
    pub fn rem_unsigned(self, rhs: WideInt) -> Result<WideInt, ArithError> {
        if rhs.is_zero() {
            return Err(ArithError::DivideByZero);
        }
        Ok(math::divmod_unsigned(self, rhs).1)
    }

    /// Compare as unsigned 64-bit values.
    pub fn cmp_unsigned(self, other: WideInt) -> Ordering {
        self.hi
            .cmp(&other.hi)
            .then_with(|| self.lo.cmp(&other.lo))
    }

    /// The hash the target runtime assigns to boxed 64-bit integers.
    pub const fn hash_code(self) -> i32 {
        (self.lo ^ self.hi) as i32
    }
}

impl Add for WideInt {
    type Output = WideInt;

    fn add(self, rhs: WideInt) -> WideInt {
        let (lo, carry) = self.lo.overflowing_add(rhs.lo);
        WideInt {
            lo,
            hi: self.hi.wrapping_add(rhs.hi).wrapping_add(carry as u32),
        }
    }
}

impl Sub for WideInt {
    type Output = WideInt;

    fn sub(self, rhs: WideInt) -> WideInt {
        let (lo, borrow) = self.lo.overflowing_sub(rhs.lo);
        WideInt {
            lo,
            hi: self.hi.wrapping_sub(rhs.hi).wrapping_sub(borrow as u32),
        }
    }
}

impl Neg for WideInt {
    type Output = WideInt;

    fn neg(self) -> WideInt {
        WideInt {
            lo: self.lo.wrapping_neg(),
            hi: if self.lo != 0 {
                !self.hi
            } else {
                self.hi.wrapping_neg()
            },
        }
    }
}

impl Mul for WideInt {
    type Output = WideInt;

    /// Wrapping multiplication built from 16-bit half-words.
    ///
    /// The low 32x32 product is assembled from four partial products so
    /// that no intermediate exceeds 32 bits -- the decomposition the code
    /// generator emits for hosts without a 64-bit multiply.
    fn mul(self, rhs: WideInt) -> WideInt {
        let alo = self.lo;
        let blo = rhs.lo;
        let a0 = alo & 0xffff;
        let a1 = alo >> 16;
        let b0 = blo & 0xffff;
        let b1 = blo >> 16;
        let a0b0 = a0.wrapping_mul(b0);
        let a1b0 = a1.wrapping_mul(b0);
        let a0b1 = a0.wrapping_mul(b1);
        let lo = a0b0.wrapping_add(a1b0.wrapping_add(a0b1) << 16);
        let c1part = (a0b0 >> 16).wrapping_add(a0b1);
        let hi = alo
            .wrapping_mul(rhs.hi)
            .wrapping_add(self.hi.wrapping_mul(blo))
            .wrapping_add(a1.wrapping_mul(b1))
            .wrapping_add(c1part >> 16)
            .wrapping_add((c1part & 0xffff).wrapping_add(a1b0) >> 16);
        WideInt { lo, hi }
    }
}

impl Not for WideInt {
    type Output = WideInt;

    fn not(self) -> WideInt {
        WideInt {
            lo: !self.lo,
            hi: !self.hi,
        }
    }
}

impl BitAnd for WideInt {
    type Output = WideInt;

    fn bitand(self, rhs: WideInt) -> WideInt {
        WideInt {
            lo: self.lo & rhs.lo,
            hi: self.hi & rhs.hi,
        }
    }
}

impl BitOr for WideInt {
    type Output = WideInt;

    fn bitor(self, rhs: WideInt) -> WideInt {
        WideInt {
            lo: self.lo | rhs.lo,
            hi: self.hi | rhs.hi,
        }
    }
}

impl BitXor for WideInt {
    type Output = WideInt;

    fn bitxor(self, rhs: WideInt) -> WideInt {
        WideInt {
            lo: self.lo ^ rhs.lo,
            hi: self.hi ^ rhs.hi,
        }
    }
}

impl Ord for WideInt {
    /// Signed order: high words as signed, then low words unsigned.
    fn cmp(&self, other: &Self) -> Ordering {
        (self.hi as i32)
            .cmp(&(other.hi as i32))
            .then_with(|| self.lo.cmp(&other.lo))
    }
}

impl PartialOrd for WideInt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for WideInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hi as i32 == (self.lo as i32) >> 31 {
            // Fits in 32 bits.
            write!(f, "{}", self.lo as i32)
        } else if self.is_negative() {
            write!(f, "-{}", math::unsigned_decimal(-*self))
        } else {
            write!(f, "{}", math::unsigned_decimal(*self))
        }
    }
}

impl fmt::Debug for WideInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WideInt({self})")
    }
}
