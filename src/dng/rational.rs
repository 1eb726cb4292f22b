//! Exact float to TIFF rational conversion.
//!
//! A finite `f32` is a dyadic rational `m * 2^e` with `m < 2^24`. The
//! conversion splits off mantissa and exponent, cancels shared factors of
//! two, and renders the result as numerator over a power-of-two denominator.
//! Values whose exponent does not fit the 32-bit fields are clamped at the
//! widest representable exponent, everything else converts exactly.

/// Numerator cap for the signed conversion.
const SIGNED_MAX: u64 = i32::MAX as u64;

/// Numerator cap for the unsigned conversion.
const UNSIGNED_MAX: u64 = u32::MAX as u64;

// (mantissa, base-2 exponent) with shared powers of two cancelled
fn decompose(x: f32) -> (u32, i32) {
    let bits = x.to_bits();
    let biased = ((bits >> 23) & 0xFF) as i32;
    let frac = bits & 0x7F_FFFF;

    let (mut mantissa, mut exponent) = if biased == 0 {
        // subnormal
        (frac, -149)
    } else {
        (frac | 0x80_0000, biased - 127 - 23)
    };
    while mantissa != 0 && mantissa & 1 == 0 && exponent < 0 {
        mantissa >>= 1;
        exponent += 1;
    }
    (mantissa, exponent)
}

fn convert(x: f32, numerator_max: u64, denominator_exp_max: u32) -> (i64, u32) {
    if !x.is_finite() {
        if x > 0.0 {
            return (1, 0);
        }
        if x < 0.0 {
            return (-1, 0);
        }
        return (0, 0);
    }

    let (mantissa, exponent) = decompose(x);
    if mantissa == 0 {
        return (0, 1);
    }

    let (magnitude, denominator) = if exponent >= 0 {
        // mantissa < 2^24, so any shift of 40 or more saturates anyway
        let magnitude = if exponent >= 40 {
            numerator_max
        } else {
            ((u64::from(mantissa)) << exponent).min(numerator_max)
        };
        (magnitude, 1u32)
    } else {
        let mut mantissa = mantissa;
        let mut e = -exponent as u32;
        if e > denominator_exp_max {
            // the denominator exponent clamps; surplus precision is shed
            let surplus = e - denominator_exp_max;
            mantissa = if surplus >= 32 { 0 } else { mantissa >> surplus };
            e = denominator_exp_max;
        }
        (u64::from(mantissa), 1u32 << e)
    };

    let signed = if x.is_sign_negative() {
        -(magnitude as i64)
    } else {
        magnitude as i64
    };
    (signed, denominator)
}

/// Converts to a signed TIFF SRATIONAL.
pub fn to_srational(x: f32) -> (i32, i32) {
    let (numerator, denominator) = convert(x, SIGNED_MAX, 30);
    (numerator as i32, denominator as i32)
}

/// Converts to an unsigned TIFF RATIONAL. Negative finite inputs clamp to a
/// zero numerator.
pub fn to_rational(x: f32) -> (u32, u32) {
    let (numerator, denominator) = convert(x, UNSIGNED_MAX, 31);
    if numerator < 0 {
        if denominator == 0 {
            // negative infinity
            return (0, 0);
        }
        return (0, 1);
    }
    (numerator as u32, denominator)
}
