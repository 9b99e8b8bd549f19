//! Bounds bit extraction, validity, and base/top reconstruction.
//!
//! This is the one piece of the algorithm every other module depends on: given a PESBT word
//! and a cursor, recover the `(base, top)` pair a format's bounds field actually encodes.

use crate::bits::{getbits, setbits, truncate};
use crate::format::CompressedCapability;

/// Decoded `(B, T, E)` triple plus the format flag bit that selects how they were packed.
/// `t` already has its top two bits inferred (they are never stored on the wire), so callers
/// can treat both `b` and `t` as full `MANTISSA_WIDTH`-bit values.
/// Equivalent to `ccx_bounds_bits` in the source.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BoundsBits {
    pub b: u128,
    pub t: u128,
    pub e: i32,
    /// `IE` for CHERI v9 / Morello, `EF` for CHERI-RISC-V. Its meaning is format-specific;
    /// callers should not read it directly outside this module.
    pub internal_exponent: bool,
}

/// Pull `(B, T, E, flag)` out of a PESBT word and infer T's top two bits (§4.1).
pub fn extract_bounds_bits<F: CompressedCapability>(pesbt: u128) -> BoundsBits {
    let ebt = getbits(pesbt, F::EBT_OFFSET, F::EBT_WIDTH);

    let mw = F::MANTISSA_WIDTH;
    let b_width = mw;
    let t_width = mw - 2;
    let b_raw = getbits(ebt, 0, b_width);
    let t_raw = getbits(ebt, b_width, t_width);
    let flag_bit = getbits(ebt, F::EBT_WIDTH - 1, 1) != 0;
    let l8_bit = if F::USES_L8 {
        getbits(ebt, b_width + t_width, F::L8_WIDTH)
    } else {
        0
    };

    let uses_internal_exponent = if F::USES_EF { !flag_bit } else { flag_bit };

    let (b, t_partial, e, l_msb) = if uses_internal_exponent {
        let exp_low = getbits(b_raw, 0, F::EXP_LOW_WIDTH);
        let exp_high = getbits(t_raw, 0, F::EXP_HIGH_WIDTH);
        let encoded = exp_low | (exp_high << F::EXP_LOW_WIDTH) | (l8_bit << (F::EXP_LOW_WIDTH + F::EXP_HIGH_WIDTH));

        let e = if F::USES_EF {
            let encoded = encoded as i64;
            let max = F::MAX_EXPONENT as i64;
            if encoded > max {
                return BoundsBits { b: 0, t: 0, e: -1, internal_exponent: true };
            }
            (max - encoded) as i32
        } else {
            encoded as i32
        };

        let b = setbits(b_raw, 0, F::EXP_LOW_WIDTH, 0);
        let t_partial = setbits(t_raw, 0, F::EXP_HIGH_WIDTH, 0);
        (b, t_partial, e, 1u128)
    } else {
        let l_msb = if F::USES_L8 { l8_bit } else { 0 };
        (b_raw, t_raw, 0, l_msb)
    };

    // Reconstruct T's top two bits from B's top two bits, the carry out of B+len implied by
    // T < B (mod 2^(mw-2)), and whether an internal exponent (or L8) is in play.
    let l_carry = if t_partial < truncate(b, mw - 2) { 1u128 } else { 0 };
    let b_top2 = getbits(b, mw - 2, 2);
    let t_infer = (b_top2 + l_carry + l_msb) & 0x3;
    let t = t_partial | (t_infer << (mw - 2));

    BoundsBits { b, t, e, internal_exponent: uses_internal_exponent }
}

/// §4.2 - reject malformed bit patterns that must decode as untagged.
pub fn bounds_bits_valid<F: CompressedCapability>(bits: &BoundsBits) -> bool {
    if bits.e < 0 {
        return false;
    }
    let mw = F::MANTISSA_WIDTH;
    let e = bits.e as u32;

    if F::USES_EF {
        if bits.internal_exponent {
            if F::USES_L8 && e == 0 {
                // zero-exponent encoding with L8 required but absent is malformed for some
                // RISC-V profiles; none of the formats here set USES_L8, so this never trips.
                return false;
            }
            if e == F::MAX_EXPONENT - 1 && getbits(bits.b, mw - 1, 1) != 0 {
                return false;
            }
            if e == F::MAX_EXPONENT && bits.b != 0 {
                return false;
            }
        }
    } else if e >= F::MAX_EXPONENT {
        let b_top2 = getbits(bits.b, mw - 2, 2);
        let t_msb = getbits(bits.t, mw - 1, 1);
        return t_msb == 0 && b_top2 == 0;
    } else if e == F::MAX_EXPONENT - 1 && getbits(bits.b, mw - 1, 1) != 0 {
        return false;
    }
    true
}

/// Decoded base/top, plus whether the pattern that produced them was well-formed (§4.3).
#[derive(Debug, Copy, Clone)]
pub struct BaseTop {
    pub base: u128,
    pub top: u128,
    pub valid: bool,
}

/// Combine extracted bounds bits with a cursor to reconstruct full base/top (§4.3).
pub fn compute_base_top<F: CompressedCapability>(bits: &BoundsBits, cursor: u128) -> BaseTop {
    // Morello reserves exponents above MAX_EXPONENT to mean "whole address space", tagged
    // only when the exponent is exactly the dedicated sentinel - everything else in that
    // range is a malformed pattern, never an ordinary large-but-finite encoding.
    if F::IS_MORELLO && bits.e >= 0 && bits.e as u32 > F::MAX_EXPONENT {
        let valid = bits.e as u32 == F::MAX_ENCODABLE_EXPONENT;
        return BaseTop { base: 0, top: 1u128 << F::ADDR_WIDTH, valid };
    }

    let valid = bounds_bits_valid::<F>(bits);
    if !valid {
        return BaseTop { base: 0, top: 0, valid: false };
    }

    let e = if bits.e > 0 { (bits.e as u32).min(F::MAX_EXPONENT) } else { 0 };
    let mw = F::MANTISSA_WIDTH;

    let (a_hi, b_hi, t_hi) = if F::USES_EF {
        let a_mid = truncate(cursor >> e, mw);
        let r = truncate(bits.b.wrapping_sub(1u128 << (mw - 2)), mw);

        let a_hi = if a_mid < r { 1 } else { 0 };
        let b_hi = if bits.b < r { 1 } else { 0 };
        let t_hi = if bits.t < r { 1 } else { 0 };
        (a_hi, b_hi, t_hi)
    } else {
        // v9/Morello variant (§4.3 step 4): compare only the top 3 bits of cursor, B and T,
        // against R3 = B[MW-1:MW-3] - 1 (mod 8), rather than the full mantissa width.
        let shift3 = e + mw - 3;
        let a3 = truncate(cursor >> shift3, 3);
        let b3 = getbits(bits.b, mw - 3, 3);
        let t3 = getbits(bits.t, mw - 3, 3);
        let r3 = truncate(b3.wrapping_sub(1), 3);

        let a_hi = if a3 < r3 { 1 } else { 0 };
        let b_hi = if b3 < r3 { 1 } else { 0 };
        let t_hi = if t3 < r3 { 1 } else { 0 };
        (a_hi, b_hi, t_hi)
    };

    let shift = e + mw;
    let a_top: i128 = if shift >= 128 { 0 } else { (cursor >> shift) as i128 };

    let base_hi = a_top + (b_hi - a_hi) as i128;
    let top_hi = a_top + (t_hi - a_hi) as i128;

    let base = (((base_hi as u128) << mw) | bits.b) << e;
    let mut top = (((top_hi as u128) << mw) | bits.t) << e;

    // Representable-region wrap correction (§4.3 step 6).
    if e < F::MAX_EXPONENT - 1 {
        let top_hi2 = getbits(top, F::ADDR_WIDTH - 1, 2);
        let base_hi1 = getbits(base, F::ADDR_WIDTH - 1, 1);
        if top_hi2.wrapping_sub(base_hi1) > 1 {
            top = setbits(top, F::ADDR_WIDTH, 1, getbits(top, F::ADDR_WIDTH, 1) ^ 1);
        }
    }

    let base = truncate(base, F::ADDR_WIDTH);
    let top = truncate(top, F::ADDR_WIDTH + 1);

    BaseTop { base, top, valid }
}
