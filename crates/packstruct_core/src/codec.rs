//! # Field Codecs
//!
//! Bit-level primitives shared by every accessor: word extract/insert,
//! the wrapping number-to-integer conversion, and an IEEE-754 binary16
//! codec.
//!
//! All functions are total. Nothing here panics or allocates.

/// `2^32` as a float, the modulus of integer wrapping.
const TWO_POW_32: f64 = 4_294_967_296.0;

/// Mask covering the low `width` bits (`width` in `1..=32`).
#[inline]
#[must_use]
pub const fn low_mask(width: u32) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

/// Reads `width` bits starting at `bit` from `word`.
#[inline]
#[must_use]
pub const fn extract(word: u32, bit: u32, width: u32) -> u32 {
    (word >> bit) & low_mask(width)
}

/// Writes the low `width` bits of `value` at `bit`, leaving other bits intact.
#[inline]
#[must_use]
pub const fn insert(word: u32, bit: u32, width: u32, value: u32) -> u32 {
    let mask = low_mask(width) << bit;
    (word & !mask) | ((value << bit) & mask)
}

/// Sign-extends the low `width` bits of `raw`.
#[inline]
#[must_use]
pub const fn sign_extend(raw: u32, width: u32) -> i32 {
    let shift = 32 - width;
    ((raw << shift) as i32) >> shift
}

/// Converts a number to its 32-bit two's-complement bit pattern.
///
/// Truncates toward zero, then wraps modulo `2^32`. NaN and infinities map
/// to zero.
#[inline]
#[must_use]
pub fn wrap_to_u32(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    value.trunc().rem_euclid(TWO_POW_32) as u32
}

// ============================================================================
// BINARY16
// ============================================================================

/// Smallest positive binary16 subnormal, `2^-24`.
pub const F16_MIN_SUBNORMAL: f64 = 5.960_464_477_539_062_5e-8;

/// Smallest positive binary16 normal, `2^-14`.
const F16_MIN_NORMAL: f64 = 6.103_515_625e-5;

/// Magnitudes at or above this round to infinity.
pub const F16_OVERFLOW: f64 = 65_520.0;

const F16_SIGN: u16 = 0x8000;
const F16_INFINITY: u16 = 0x7c00;
const F16_QUIET_NAN: u16 = 0x7e00;

/// Rounds half to even.
#[inline]
fn round_ties_even(value: f64) -> f64 {
    let rounded = value.round();
    if (value - value.trunc()).abs() == 0.5 && rounded % 2.0 != 0.0 {
        rounded - value.signum()
    } else {
        rounded
    }
}

/// Encodes a number as binary16 bits.
///
/// Round-to-nearest-even for in-range values, `+-Infinity` at and above
/// [`F16_OVERFLOW`], signed zero below [`F16_MIN_SUBNORMAL`].
#[must_use]
pub fn f16_from_f64(value: f64) -> u16 {
    if value.is_nan() {
        return F16_QUIET_NAN;
    }
    let sign = if value.is_sign_negative() { F16_SIGN } else { 0 };
    let magnitude = value.abs();

    if magnitude >= F16_OVERFLOW {
        return sign | F16_INFINITY;
    }
    if magnitude < F16_MIN_SUBNORMAL {
        return sign;
    }
    if magnitude < F16_MIN_NORMAL {
        // Subnormal: value = mantissa * 2^-24. A mantissa of 1024 rolls over
        // into the smallest normal, which is the correct encoding.
        let mantissa = round_ties_even(magnitude / F16_MIN_SUBNORMAL) as u16;
        return sign | mantissa;
    }

    // Normal f64 here, so the biased exponent is exact.
    let mut exponent = ((magnitude.to_bits() >> 52) & 0x7ff) as i32 - 1023;
    let fraction = magnitude / 2f64.powi(exponent) - 1.0;
    let mut mantissa = round_ties_even(fraction * 1024.0) as u16;
    if mantissa == 1024 {
        mantissa = 0;
        exponent += 1;
    }
    if exponent > 15 {
        return sign | F16_INFINITY;
    }
    sign | (((exponent + 15) as u16) << 10) | mantissa
}

/// Decodes binary16 bits.
#[must_use]
pub fn f16_to_f64(bits: u16) -> f64 {
    let sign = if bits & F16_SIGN != 0 { -1.0 } else { 1.0 };
    let exponent = i32::from((bits >> 10) & 0x1f);
    let mantissa = f64::from(bits & 0x03ff);

    match exponent {
        0 => sign * mantissa * F16_MIN_SUBNORMAL,
        0x1f if mantissa == 0.0 => sign * f64::INFINITY,
        0x1f => f64::NAN,
        _ => sign * (1.0 + mantissa / 1024.0) * 2f64.powi(exponent - 15),
    }
}
