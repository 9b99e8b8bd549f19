//! Bounds encoder: turn a requested `[base, top)` into the minimal exponent plus B/T fields
//! that cover it (§4.4 "compute-EBT").

use crate::bits::{getbits, idx_msnz, truncate};
use crate::format::CompressedCapability;

/// Result of encoding a requested bounds interval.
pub struct EncodedBounds {
    /// The full EBT bit pattern (B, T, exponent fragments, L8, flag bit), ready to splice
    /// into a PESBT word at `F::EBT_OFFSET`.
    pub ebt: u128,
    pub exact: bool,
}

fn encode_exponent_fragment<F: CompressedCapability>(e: u32) -> u128 {
    if F::USES_EF {
        (F::MAX_EXPONENT - e) as u128
    } else {
        e as u128
    }
}

/// Exponent search shared by `compute_ebt` and `get_alignment_mask`: find the smallest `e` for
/// which `req_top`'s mantissa-width-minus-2-bit top fragment (plus any carry out of the bits
/// the exponent discards) fits without overflow. `compute_ebt` and `get_alignment_mask` must
/// agree on this value, or the alignment mask stops matching what `compute_ebt` actually does.
fn find_required_exponent<F: CompressedCapability>(req_top: u128, initial_e: u32) -> u32 {
    let mw = F::MANTISSA_WIDTH;
    let top_ie_width = (mw - 2) - F::EXP_HIGH_WIDTH;
    let mut e = initial_e;
    loop {
        let shift = e + F::EXP_LOW_WIDTH;
        let mut t_ie = getbits(req_top >> shift, 0, top_ie_width);
        if getbits(req_top, 0, shift) != 0 {
            t_ie = t_ie.wrapping_add(1);
        }
        if getbits(t_ie, top_ie_width, 1) != 0 {
            // Carry overflowed the T mantissa field - widen the exponent and retry once.
            e += 1;
            continue;
        }
        return e;
    }
}

/// §4.4: produce the minimal-exponent EBT encoding of `[req_base, req_top)`.
pub fn compute_ebt<F: CompressedCapability>(req_base: u128, req_top: u128) -> EncodedBounds {
    let mw = F::MANTISSA_WIDTH;
    let len_width = F::ADDR_WIDTH + 1;
    let length = truncate(req_top.wrapping_sub(req_base), len_width);

    let initial_e = if length >= (1u128 << (mw - 1)) {
        (idx_msnz(length, len_width) - (mw as i32 - 2)).max(0) as u32
    } else {
        0
    };

    // Zero-exponent exact case: length fits directly with no rounding.
    if initial_e == 0 && getbits(length, mw - 2, 1) == 0 {
        let b = truncate(req_base, mw);
        let t = truncate(req_top, mw);
        let flag_bit: u128 = if F::USES_EF { 1 } else { 0 };
        let ebt = b | (t << mw) | (flag_bit << (F::EBT_WIDTH - 1));
        return EncodedBounds { ebt, exact: true };
    }

    let e = find_required_exponent::<F>(req_top, initial_e);

    let bot_ie_width = mw - F::EXP_LOW_WIDTH;
    let top_ie_width = (mw - 2) - F::EXP_HIGH_WIDTH;

    {
        let shift = e + F::EXP_LOW_WIDTH;
        let mut b_ie = getbits(req_base >> shift, 0, bot_ie_width);
        let mut t_ie = getbits(req_top >> shift, 0, top_ie_width);

        let lost_bits = getbits(req_top, 0, shift) != 0;
        if lost_bits {
            t_ie = t_ie.wrapping_add(1);
        }

        let lost_b = getbits(req_base, 0, shift) != 0;
        let exact = !lost_bits && !lost_b;

        let stored_e = encode_exponent_fragment::<F>(e);
        let exp_low = getbits(stored_e, 0, F::EXP_LOW_WIDTH);
        let exp_high = getbits(stored_e, F::EXP_LOW_WIDTH, F::EXP_HIGH_WIDTH);
        let l8 = if F::USES_L8 {
            getbits(stored_e, F::EXP_LOW_WIDTH + F::EXP_HIGH_WIDTH, F::L8_WIDTH)
        } else {
            0
        };

        b_ie = truncate(b_ie, bot_ie_width);
        t_ie = truncate(t_ie, top_ie_width);

        let b_field = (b_ie << F::EXP_LOW_WIDTH) | exp_low;
        let t_field = (t_ie << F::EXP_HIGH_WIDTH) | exp_high;
        let flag_bit: u128 = if F::USES_EF { 0 } else { 1 };

        let ebt = b_field
            | (t_field << mw)
            | (l8 << (mw + (mw - 2)))
            | (flag_bit << (F::EBT_WIDTH - 1));

        return EncodedBounds { ebt, exact };
    }
}

/// The alignment mask (CRAM) for a requested length: the low address bits that must be zero
/// for the length to be precisely representable. Derived from the same exponent search
/// `compute_ebt` uses (base 0, top `length`), retries included, so the two never disagree
/// about which exponent a given length actually rounds to.
pub fn get_alignment_mask<F: CompressedCapability>(length: u128) -> u128 {
    let mw = F::MANTISSA_WIDTH;
    let initial_e = if length >= (1u128 << (mw - 1)) {
        (idx_msnz(length, F::ADDR_WIDTH + 1) - (mw as i32 - 2)).max(0) as u32
    } else {
        0
    };
    let e = find_required_exponent::<F>(length, initial_e);
    let shift = e + F::EXP_LOW_WIDTH;
    if shift >= F::ADDR_WIDTH {
        0
    } else {
        truncate(u128::MAX << shift, F::ADDR_WIDTH)
    }
}

/// The smallest length `>= length` that is exactly representable.
pub fn get_representable_length<F: CompressedCapability>(length: u128) -> u128 {
    let mask = get_alignment_mask::<F>(length);
    truncate(length.wrapping_add(!mask), F::ADDR_WIDTH) & mask
}

/// `!get_alignment_mask(length) + 1`: the smallest power-of-two alignment a base must have
/// for `length` to be exactly representable.
pub fn get_required_alignment<F: CompressedCapability>(length: u128) -> u128 {
    (!get_alignment_mask::<F>(length)).wrapping_add(1) & truncate(u128::MAX, F::ADDR_WIDTH)
}
