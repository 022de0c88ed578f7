//! Ratio codec: a minimal 16-bit floating-point word for aspect ratios
//!
//! Packs a positive decimal into 1 sign bit, a 4-bit exponent magnitude, and
//! an 11-bit mantissa with an implicit leading 1. The sign bit encodes which
//! side of 1.0 the value falls on (0 for `x >= 1`, 1 for `x < 1`), and the
//! format is deliberately lossy: `unpack(pack(x))` is only guaranteed to land
//! within the representable precision of `x`.

use std::fmt;

/// Mantissa width in bits (implicit leading 1 not stored)
pub const MANTISSA_BITS: u32 = 11;

/// Exponent magnitude width in bits
pub const EXPONENT_BITS: u32 = 4;

/// Total packed word width
pub const WORD_BITS: u32 = MANTISSA_BITS + EXPONENT_BITS + 1;

/// A ratio that cannot be represented in the packed word
///
/// Raised when the exponent magnitude overflows its 4-bit budget, or when a
/// sub-1 value has no leading bit within the mantissa scan.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecisionError {
    pub value: f64,
}

impl fmt::Display for PrecisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not enough precision to represent ratio {}", self.value)
    }
}

impl std::error::Error for PrecisionError {}

/// Pack a positive ratio into a 16-bit word
///
/// Zero packs to the canonical zero word. Values whose integer part needs
/// more than 16 exponent steps, and sub-1 values too small to surface a
/// leading bit within the mantissa scan, are unrepresentable.
pub fn pack(num: f64) -> Result<u16, PrecisionError> {
    if num == 0.0 {
        return Ok(0);
    }
    if !num.is_finite() || num < 0.0 {
        return Err(PrecisionError { value: num });
    }

    let integral = num.trunc() as u64;
    let mut frac = num - integral as f64;
    let int_bits = if integral > 0 {
        64 - integral.leading_zeros()
    } else {
        0
    };

    // Mantissa bit sequence, most significant first: the integer part's
    // binary digits followed by a binary-fraction expansion of the decimal
    // part, truncated to the mantissa budget.
    let mut bits: Vec<u8> = Vec::with_capacity(WORD_BITS as usize);
    for i in (0..int_bits).rev() {
        bits.push(((integral >> i) & 1) as u8);
    }
    let budget = (MANTISSA_BITS as i64 - int_bits as i64 + 1).max(0);
    for _ in 0..budget {
        if frac == 0.0 {
            break;
        }
        frac *= 2.0;
        let bit = frac.trunc();
        bits.push(bit as u8);
        frac -= bit;
    }

    let (sign, exp, mantissa) = if integral > 0 {
        (0u16, int_bits - 1, &bits[..])
    } else {
        let lead = bits
            .iter()
            .position(|&b| b == 1)
            .ok_or(PrecisionError { value: num })?;
        (1u16, lead as u32 + 1, &bits[lead..])
    };

    if exp >= (1 << EXPONENT_BITS) {
        return Err(PrecisionError { value: num });
    }

    let mut word = (sign << (WORD_BITS - 1)) | ((exp as u16) << MANTISSA_BITS);
    // Drop the implicit leading 1 and left-justify the rest into the field.
    for (i, &bit) in mantissa
        .iter()
        .skip(1)
        .take(MANTISSA_BITS as usize)
        .enumerate()
    {
        if bit == 1 {
            word |= 1 << (MANTISSA_BITS - 1 - i as u32);
        }
    }

    Ok(word)
}

/// Unpack a 16-bit word back into an approximate ratio
pub fn unpack(word: u16) -> f64 {
    let sign = (word >> (WORD_BITS - 1)) & 1;
    let mut exp = ((word >> MANTISSA_BITS) & ((1 << EXPONENT_BITS) - 1)) as i32;
    if sign == 1 {
        exp = -exp;
    }

    let mut value = 0.0;
    for idx in 0..=(MANTISSA_BITS as i32) {
        let bit = if idx == 0 {
            // implicit leading 1
            1
        } else {
            (word >> (MANTISSA_BITS as i32 - idx)) & 1
        };
        if bit == 1 {
            value += 2f64.powi(exp - idx);
        }
    }
    value
}
