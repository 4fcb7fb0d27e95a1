//! This module contains the definition of [`BitVector`], the fixed-width
//! integer value that carries all concrete numeric data in the semantic
//! representation.

use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
    ops::{Add, BitAnd, BitOr, BitXor, Mul, Neg, Not, Sub},
};

use ethnum::{I256, U256};

use crate::{
    constant::MAXIMUM_VALUE_WIDTH,
    error::value::{Error, Result},
};

/// A fixed-width integer of 1 to [`MAXIMUM_VALUE_WIDTH`] bits.
///
/// The value is stored zero-extended in a 256-bit word and is always kept
/// within `[0, 2^width)`. The signed view reinterprets the high bit of the
/// width as a sign bit.
///
/// All operations are pure. Width-preserving operations produce a result of
/// `max(lhs.width(), rhs.width())` bits when the operand widths differ,
/// zero-extending the narrower operand, or sign-extending it for the
/// operations that interpret their operands as signed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct BitVector {
    /// The unsigned value, always within `[0, 2^width)`.
    value: U256,

    /// The width of the value in bits.
    width: u16,
}

impl BitVector {
    /// Constructs a new bit-vector of `width` bits holding the low `width`
    /// bits of `value`.
    ///
    /// A width outside `1..=`[`MAXIMUM_VALUE_WIDTH`] is a construction-time
    /// defect: it is logged, and the width is clamped into range so that the
    /// value is still created.
    #[must_use]
    pub fn new(width: u16, value: impl Into<U256>) -> Self {
        let width = Self::checked_width(width);
        let value = value.into() & Self::mask(width);
        Self { value, width }
    }

    /// Constructs a new bit-vector of `width` bits from a signed machine
    /// integer, sign-extending it into the 256-bit store and then truncating
    /// to `width` bits.
    #[must_use]
    pub fn from_signed(width: u16, value: i64) -> Self {
        let width = Self::checked_width(width);
        let value = I256::from(value).as_u256() & Self::mask(width);
        Self { value, width }
    }

    /// Constructs the 1-bit bit-vector encoding of `value`.
    #[must_use]
    pub fn from_bool(value: bool) -> Self {
        Self::new(1, if value { 1u8 } else { 0u8 })
    }

    /// Gets the width of the value in bits.
    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Gets the unsigned value.
    #[must_use]
    pub fn value(&self) -> U256 {
        self.value
    }

    /// Gets the value under the signed reinterpretation of the high bit,
    /// extended to the full 256-bit range.
    #[must_use]
    pub fn signed_value(&self) -> I256 {
        if u32::from(self.width) == U256::BITS {
            return self.value.as_i256();
        }
        let sign_bit = U256::ONE << u32::from(self.width - 1);
        if self.value & sign_bit != U256::ZERO {
            (self.value | (U256::MAX << u32::from(self.width))).as_i256()
        } else {
            self.value.as_i256()
        }
    }

    /// Checks whether the value is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value == U256::ZERO
    }

    /// Converts the value to a machine integer by truncation.
    #[must_use]
    pub fn to_u64(&self) -> u64 {
        self.value.as_u64()
    }

    /// Converts the signed view of the value to a machine integer by
    /// truncation.
    #[must_use]
    pub fn to_i64(&self) -> i64 {
        self.signed_value().as_i64()
    }

    /// Converts the value to a boolean; any non-zero value is true.
    #[must_use]
    pub fn to_bool(&self) -> bool {
        !self.is_zero()
    }

    /// Performs unsigned division, failing when the divisor is zero.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `divisor` is zero.
    pub fn unsigned_div(&self, divisor: &Self) -> Result<Self> {
        let (lhs, rhs, width) = Self::unify_unsigned(self, divisor);
        let value = lhs.checked_div(rhs).ok_or(Error::DivisionByZero)?;
        Ok(Self::new(width, value))
    }

    /// Performs signed division, failing when the divisor is zero.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `divisor` is zero.
    pub fn signed_div(&self, divisor: &Self) -> Result<Self> {
        let (lhs, rhs, width) = Self::unify_signed(self, divisor);
        if rhs == I256::ZERO {
            return Err(Error::DivisionByZero);
        }
        Ok(Self::new(width, lhs.wrapping_div(rhs).as_u256()))
    }

    /// Computes the unsigned remainder, failing when the divisor is zero.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `divisor` is zero.
    pub fn unsigned_rem(&self, divisor: &Self) -> Result<Self> {
        let (lhs, rhs, width) = Self::unify_unsigned(self, divisor);
        let value = lhs.checked_rem(rhs).ok_or(Error::DivisionByZero)?;
        Ok(Self::new(width, value))
    }

    /// Computes the signed remainder, with the sign of the dividend, failing
    /// when the divisor is zero.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `divisor` is zero.
    pub fn signed_rem(&self, divisor: &Self) -> Result<Self> {
        let (lhs, rhs, width) = Self::unify_signed(self, divisor);
        if rhs == I256::ZERO {
            return Err(Error::DivisionByZero);
        }
        Ok(Self::new(width, lhs.wrapping_rem(rhs).as_u256()))
    }

    /// Shifts the value left, with the shift count taken modulo the width.
    #[must_use]
    pub fn shift_left(&self, count: &Self) -> Self {
        let count = self.shift_count(count);
        self.map(|value| value << count)
    }

    /// Shifts the value right without regard for the sign bit, with the
    /// shift count taken modulo the width.
    #[must_use]
    pub fn logical_shift_right(&self, count: &Self) -> Self {
        let count = self.shift_count(count);
        self.map(|value| value >> count)
    }

    /// Shifts the value right, replicating the sign bit, with the shift
    /// count taken modulo the width.
    #[must_use]
    pub fn arithmetic_shift_right(&self, count: &Self) -> Self {
        let count = self.shift_count(count);
        Self::new(self.width, (self.signed_value() >> count).as_u256())
    }

    /// Rotates the value left, with the count taken modulo the width.
    #[must_use]
    pub fn rotate_left(&self, count: &Self) -> Self {
        let count = self.shift_count(count);
        if count == 0 {
            return *self;
        }
        let width = u32::from(self.width);
        self.map(|value| (value << count) | (value >> (width - count)))
    }

    /// Rotates the value right, with the count taken modulo the width.
    #[must_use]
    pub fn rotate_right(&self, count: &Self) -> Self {
        let count = self.shift_count(count);
        if count == 0 {
            return *self;
        }
        let width = u32::from(self.width);
        self.map(|value| (value >> count) | (value << (width - count)))
    }

    /// Widens the value to `width` bits, replicating the sign bit.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `width` is narrower than the current width or
    /// wider than [`MAXIMUM_VALUE_WIDTH`].
    pub fn sign_extend(&self, width: u16) -> Result<Self> {
        self.check_extension(width)?;
        Ok(Self::new(width, self.signed_value().as_u256()))
    }

    /// Widens the value to `width` bits, filling with zeroes.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `width` is narrower than the current width or
    /// wider than [`MAXIMUM_VALUE_WIDTH`].
    pub fn zero_extend(&self, width: u16) -> Result<Self> {
        self.check_extension(width)?;
        Ok(Self::new(width, self.value))
    }

    /// Extracts the field selected by the set bits of `mask`, shifting it
    /// down to bit zero. The result is as wide as the number of bits set in
    /// the mask.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the mask is zero.
    pub fn extract_bits(&self, mask: &Self) -> Result<Self> {
        if mask.is_zero() {
            return Err(Error::EmptyBitRange);
        }
        let field_width = u16::try_from(mask.value.count_ones()).expect("popcount fits in a u16");
        let value = (self.value & mask.value) >> mask.value.trailing_zeros();
        Ok(Self::new(field_width, value))
    }

    /// Inserts the value into the field selected by the set bits of `mask`,
    /// shifting it up from bit zero. The result is as wide as the mask.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the mask is zero.
    pub fn insert_bits(&self, mask: &Self) -> Result<Self> {
        if mask.is_zero() {
            return Err(Error::EmptyBitRange);
        }
        let value = (self.value << mask.value.trailing_zeros()) & mask.value;
        Ok(Self::new(mask.width, value))
    }

    /// Reverses the order of the bytes making up the value. Widths that are
    /// not a whole number of bytes are swapped over their rounded-up byte
    /// count and truncated back to the width.
    #[must_use]
    pub fn swap_bytes(&self) -> Self {
        let count = usize::from(self.width.div_ceil(8));
        let mut bytes = self.value.to_le_bytes();
        bytes[..count].reverse();
        Self::new(self.width, U256::from_le_bytes(bytes))
    }

    /// Finds the index of the lowest set bit.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the value is zero, for which a bit scan has no
    /// defined result.
    pub fn bit_scan_forward(&self) -> Result<Self> {
        if self.is_zero() {
            return Err(Error::UndefinedBitScan);
        }
        Ok(Self::new(self.width, self.value.trailing_zeros()))
    }

    /// Finds the index of the highest set bit.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the value is zero, for which a bit scan has no
    /// defined result.
    pub fn bit_scan_reverse(&self) -> Result<Self> {
        if self.is_zero() {
            return Err(Error::UndefinedBitScan);
        }
        Ok(Self::new(self.width, U256::BITS - 1 - self.value.leading_zeros()))
    }

    /// Tiles the value across `width` bits, repeating it every
    /// `self.width()` bits starting from bit zero.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `width` is not a positive multiple of the lane
    /// width within [`MAXIMUM_VALUE_WIDTH`].
    pub fn broadcast(&self, width: u16) -> Result<Self> {
        if width == 0 || width > MAXIMUM_VALUE_WIDTH || width % self.width != 0 {
            return Err(Error::InvalidBroadcast {
                lane: self.width,
                target: width,
            });
        }
        let mut value = U256::ZERO;
        let mut filled = 0;
        while filled < width {
            value |= self.value << u32::from(filled);
            filled += self.width;
        }
        Ok(Self::new(width, value))
    }

    /// Orders two values by their unsigned interpretation, widening as for
    /// any other unsigned operation.
    #[must_use]
    pub fn unsigned_cmp(&self, other: &Self) -> Ordering {
        let (lhs, rhs, _) = Self::unify_unsigned(self, other);
        lhs.cmp(&rhs)
    }

    /// Orders two values by their signed interpretation, widening as for any
    /// other signed operation.
    #[must_use]
    pub fn signed_cmp(&self, other: &Self) -> Ordering {
        let (lhs, rhs, _) = Self::unify_signed(self, other);
        lhs.cmp(&rhs)
    }

    /// Clamps a requested width into the representable range, logging when
    /// the request was out of range.
    fn checked_width(width: u16) -> u16 {
        if width == 0 {
            log::warn!("a bit-vector cannot be zero bits wide; clamping to 1");
            1
        } else if width > MAXIMUM_VALUE_WIDTH {
            log::warn!(
                "a bit-vector cannot be {width} bits wide; clamping to {MAXIMUM_VALUE_WIDTH}"
            );
            MAXIMUM_VALUE_WIDTH
        } else {
            width
        }
    }

    /// The bit mask selecting the low `width` bits.
    fn mask(width: u16) -> U256 {
        if u32::from(width) == U256::BITS {
            U256::MAX
        } else {
            (U256::ONE << u32::from(width)) - 1
        }
    }

    /// Applies `f` to the raw value and truncates the result back to the
    /// width.
    fn map(&self, f: impl FnOnce(U256) -> U256) -> Self {
        Self::new(self.width, f(self.value))
    }

    /// Reduces a shift count operand modulo the width.
    fn shift_count(&self, count: &Self) -> u32 {
        (count.value % U256::from(u64::from(self.width))).as_u32()
    }

    /// Brings both operands to the common width under the unsigned view.
    ///
    /// Values are stored zero-extended, so no adjustment beyond picking the
    /// result width is needed.
    fn unify_unsigned(lhs: &Self, rhs: &Self) -> (U256, U256, u16) {
        (lhs.value, rhs.value, lhs.width.max(rhs.width))
    }

    /// Brings both operands to the common width under the signed view.
    fn unify_signed(lhs: &Self, rhs: &Self) -> (I256, I256, u16) {
        (
            lhs.signed_value(),
            rhs.signed_value(),
            lhs.width.max(rhs.width),
        )
    }

    /// Validates a requested extension target width.
    fn check_extension(&self, width: u16) -> Result<()> {
        if width > MAXIMUM_VALUE_WIDTH {
            Err(Error::InvalidWidth { width })
        } else if width < self.width {
            Err(Error::NarrowingExtension {
                from: self.width,
                to: width,
            })
        } else {
            Ok(())
        }
    }
}

impl Add for BitVector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let (lhs, rhs, width) = Self::unify_unsigned(&self, &rhs);
        Self::new(width, lhs.wrapping_add(rhs))
    }
}

impl Sub for BitVector {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let (lhs, rhs, width) = Self::unify_unsigned(&self, &rhs);
        Self::new(width, lhs.wrapping_sub(rhs))
    }
}

impl Mul for BitVector {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let (lhs, rhs, width) = Self::unify_unsigned(&self, &rhs);
        Self::new(width, lhs.wrapping_mul(rhs))
    }
}

impl BitAnd for BitVector {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        let (lhs, rhs, width) = Self::unify_unsigned(&self, &rhs);
        Self::new(width, lhs & rhs)
    }
}

impl BitOr for BitVector {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        let (lhs, rhs, width) = Self::unify_unsigned(&self, &rhs);
        Self::new(width, lhs | rhs)
    }
}

impl BitXor for BitVector {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        let (lhs, rhs, width) = Self::unify_unsigned(&self, &rhs);
        Self::new(width, lhs ^ rhs)
    }
}

impl Not for BitVector {
    type Output = Self;

    fn not(self) -> Self {
        self.map(|value| !value)
    }
}

/// Two's complement negation within the width.
impl Neg for BitVector {
    type Output = Self;

    fn neg(self) -> Self {
        self.map(|value| U256::ZERO.wrapping_sub(value))
    }
}

/// Pretty-prints the value as a hexadecimal-encoded number.
impl Display for BitVector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let str = hex::encode(self.value.to_be_bytes());
        let str = str.trim_start_matches('0');
        let str = if str.is_empty() { "0" } else { str };
        write!(f, "0x{str}")
    }
}
