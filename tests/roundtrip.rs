use cheri_compressed_cap::{CcxCap, CheriV9_128, Morello, RiscV64};
use quickcheck_macros::quickcheck;

/// §8 round-trip law: `compress_raw(decompress_raw(pesbt, cursor, tag)) = pesbt`.
#[quickcheck]
fn riscv64_compress_decompress_round_trips(pesbt: u64, cursor: u64, tag: bool) -> bool {
    let cap = CcxCap::<RiscV64>::decompress_raw(pesbt, cursor, tag);
    cap.compress_raw() == pesbt
}

#[quickcheck]
fn morello_compress_decompress_round_trips(pesbt: u64, cursor: u64, tag: bool) -> bool {
    let cap = CcxCap::<Morello>::decompress_raw(pesbt, cursor, tag);
    cap.compress_raw() == pesbt
}

/// §8: `decompress_mem(compress_mem(c)) = c` for any well-formed (tagged-or-not) capability.
#[quickcheck]
fn riscv64_mem_round_trips(pesbt: u64, cursor: u64, tag: bool) -> bool {
    let cap = CcxCap::<RiscV64>::decompress_mem(pesbt, cursor, tag);
    let mem = cap.compress_mem();
    let round = CcxCap::<RiscV64>::decompress_mem(mem, cursor, tag);
    round.base() == cap.base() && round.top() == cap.top() && round.permissions() == cap.permissions()
}

#[test]
fn null_mem_image_decodes_to_null_cap() {
    let cap = CcxCap::<RiscV64>::decompress_mem(0, 0x1000, false);
    assert!(!cap.tag());
    assert_eq!(cap.base(), 0);
    assert_eq!(cap.top(), 1u128 << 64);
    assert_eq!(cap.compress_mem(), 0);
}

/// Non-EF formats only reach the full-address-space null capability via NULL_XOR_MASK;
/// RiscV64 above is an EF format and can't exercise that path.
#[test]
fn null_mem_image_decodes_to_null_cap_on_non_ef_formats() {
    let v9 = CcxCap::<CheriV9_128>::decompress_mem(0, 0x1000, false);
    assert!(!v9.tag());
    assert_eq!(v9.base(), 0);
    assert_eq!(v9.top(), 1u128 << 64);
    assert_eq!(v9.compress_mem(), 0);

    let morello = CcxCap::<Morello>::decompress_mem(0, 0x1000, false);
    assert!(!morello.tag());
    assert_eq!(morello.base(), 0);
    assert_eq!(morello.top(), 1u128 << 64);
    assert_eq!(morello.compress_mem(), 0);
}

/// §8 bounds encoder law, against the length the review's counterexample for
/// `get_alignment_mask` was built on: the mask must only ever certify bases that
/// `compute_ebt` actually encodes exactly.
#[test]
fn alignment_mask_is_consistent_with_compute_ebt_for_length_8185() {
    let len: u128 = 8185;
    let mask = cheri_compressed_cap::get_alignment_mask::<RiscV64>(len);
    for base in [8u128, 16, 24, 32, 1 << 20] {
        if base & !mask == 0 {
            let mut cap = CcxCap::<RiscV64>::make_max_perms_cap(0, base as u64, 1u128 << 64);
            let exact = cap.set_bounds(len);
            assert!(exact, "base {base:#x} satisfies the mask but rounded inexactly");
        }
    }
}

/// §8 bounds encoder law: the rounded interval always covers the request.
#[quickcheck]
fn set_bounds_always_covers_request(base: u32, len: u16) -> bool {
    let base = base as u64;
    let len = len as u128;
    let mut cap = CcxCap::<RiscV64>::make_max_perms_cap(0, base, 1u128 << 64);
    cap.set_bounds(len);
    let new_base = cap.base() as u128;
    let new_top: u128 = cap.top();
    new_base <= base as u128 && new_top >= base as u128 + len
}

/// §8 representability law: a cursor inside `[base, top)` is always representable.
#[quickcheck]
fn cursor_within_bounds_is_always_representable(offset: u16) -> bool {
    let cap = CcxCap::<RiscV64>::make_max_perms_cap(0x1_0000, 0x1_0000, 0x2_0000);
    let new_addr = 0x1_0000u64 + (offset as u64 % 0x1_0000);
    cap.is_representable_with_new_addr(new_addr)
}
