//! Representability engine: can a new cursor be installed without changing decoded bounds?
//! (§4.5)

use crate::bits::{getbits, truncate};
use crate::bounds::{compute_base_top, extract_bounds_bits};
use crate::format::CompressedCapability;

/// Re-run bounds reconstruction at `new_cursor` and compare against the capability's cached
/// `(base, top)`. This is the only check RISC-V formats may use.
pub fn precise_is_representable_new_addr<F: CompressedCapability>(
    pesbt: u128,
    base: u128,
    top: u128,
    new_cursor: u128,
) -> bool {
    let bits = extract_bounds_bits::<F>(pesbt);
    let bt = compute_base_top::<F>(&bits, new_cursor);
    bt.valid && bt.base == base && bt.top == top
}

/// Constant-time approximate representability check (§4.5). Not valid for RISC-V formats.
pub fn fast_is_representable_new_addr<F: CompressedCapability>(
    pesbt: u128,
    cursor: u128,
    new_cursor: u128,
    base: u128,
    top: u128,
) -> bool {
    if new_cursor >= base && new_cursor < top {
        return true;
    }

    let bits = extract_bounds_bits::<F>(pesbt);
    if bits.e < 0 {
        return false;
    }
    let e = bits.e as u32;
    if e >= F::MAX_EXPONENT - 2 {
        return true;
    }

    let mw = F::MANTISSA_WIDTH;
    let delta = truncate(new_cursor.wrapping_sub(cursor), F::ADDR_WIDTH);
    // Arithmetic-shift-right by (e + mw), sign-extended across ADDR_WIDTH bits.
    let shift = e + mw;
    let i_top: i128 = if shift >= F::ADDR_WIDTH {
        if getbits(delta, F::ADDR_WIDTH - 1, 1) != 0 { -1 } else { 0 }
    } else {
        let signed = sign_extend(delta, F::ADDR_WIDTH);
        signed >> shift
    };
    let i_mid = truncate(delta >> e, mw);
    let a_mid = truncate(cursor >> e, mw);

    let r = getbits(bits.b, mw - 3, 3).wrapping_sub(1) & 0x7;
    let r = r << (mw - 3);

    let diff = truncate(r.wrapping_sub(a_mid), mw);
    let diff1 = truncate(diff.wrapping_sub(1), mw);

    if i_top == 0 && i_mid < diff1 {
        true
    } else {
        i_top == -1 && i_mid >= diff && r != a_mid
    }
}

fn sign_extend(value: u128, width: u32) -> i128 {
    let shift = 128 - width;
    ((value << shift) as i128) >> shift
}

/// Morello-only: does a cursor's sign bit determine whether its bounds depend on its value?
/// Used by `set_address` to decide whether a sign change must detag the capability.
pub fn cap_sign_change<F: CompressedCapability>(old_cursor: u128, new_cursor: u128) -> bool {
    debug_assert!(F::IS_MORELLO, "sign-change tracking is a Morello-only quirk");
    let bit = F::ADDR_WIDTH - 1;
    getbits(old_cursor, bit, 1) != getbits(new_cursor, bit, 1)
}
