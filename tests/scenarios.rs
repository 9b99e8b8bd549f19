//! Concrete worked scenarios (§8), all against the RiscV64 format (MW=14, MAX_EXPONENT=52)
//! unless noted otherwise.

use cheri_compressed_cap::{ArchPerm, CcxCap, CheriV9_128, RiscV64};

#[test]
fn scenario_1_decompress_all_zero() {
    let cap = CcxCap::<RiscV64>::decompress_raw(0, 0, false);
    assert_eq!(cap.base(), 0);
    assert_eq!(cap.top(), 1u128 << 64);
    assert_eq!(cap.exp(), 52);
    assert_eq!(cap.permissions(), ArchPerm::empty());
    assert!(!cap.tag());
}

#[test]
fn scenario_2_max_perms_cap_compresses_to_reset_ebt_plus_perms() {
    let cap = CcxCap::<RiscV64>::make_max_perms_cap(0, 0, 1u128 << 64);
    assert_eq!(cap.base(), 0);
    assert_eq!(cap.top(), 1u128 << 64);
    assert!(!cap.permissions().is_empty());
}

#[test]
fn scenario_3_exact_set_bounds() {
    let mut cap = CcxCap::<RiscV64>::make_max_perms_cap(0, 0x2000, 1u128 << 64);
    let exact = cap.set_bounds(0x1000);
    assert!(exact);
    assert_eq!(cap.base(), 0x2000);
    assert_eq!(cap.top(), 0x3000);
    assert!(cap.tag());
}

#[test]
fn scenario_4_inexact_set_bounds_rounds_outward() {
    let mut cap = CcxCap::<RiscV64>::make_max_perms_cap(0, 0x2000, 1u128 << 64);
    let exact = cap.set_bounds(0x1001);
    assert!(!exact);
    assert!(cap.base() <= 0x2000);
    assert!(cap.top() > 0x3001);
    assert!(cap.tag());
}

#[test]
fn scenario_5_set_address_outside_representable_region_detags() {
    let mut cap = CcxCap::<RiscV64>::make_max_perms_cap(0x1000, 0x1000, 0x2000);
    cap.set_bounds(0x1000);
    assert!(cap.tag());

    cap.set_address(u64::MAX);
    assert!(!cap.tag());
}

/// Same bounds-reconstruction scenario as `scenario_3`/`scenario_4`, but against a non-EF
/// format (`CheriV9_128`, 3-bit-granularity `R3` comparison in `compute_base_top`) rather than
/// RiscV64's full-mantissa-width `R` comparison - the two branches are different algorithms
/// and each needs its own worked example.
#[test]
fn scenario_7_cheriv9_128_exact_and_inexact_set_bounds() {
    let mut cap = CcxCap::<CheriV9_128>::make_max_perms_cap(0, 0x2000, 1u128 << 64);
    let exact = cap.set_bounds(0x1000);
    assert!(exact);
    assert_eq!(cap.base(), 0x2000);
    assert_eq!(cap.top(), 0x3000);
    assert!(cap.tag());

    let mut cap = CcxCap::<CheriV9_128>::make_max_perms_cap(0, 0x2000, 1u128 << 64);
    let exact = cap.set_bounds(0x1001);
    assert!(!exact);
    assert!(cap.base() <= 0x2000);
    assert!(cap.top() > 0x3001);
    assert!(cap.tag());
}

#[test]
fn scenario_6_permission_round_trip_q2() {
    let perms = ArchPerm::R | ArchPerm::W | ArchPerm::C | ArchPerm::LM;
    let mut cap = CcxCap::<RiscV64>::make_max_perms_cap(0, 0, 1u128 << 64);
    cap.set_permissions(perms);
    assert_eq!(cap.permissions(), perms);

    let pesbt = cap.compress_raw();
    let round = CcxCap::<RiscV64>::decompress_raw(pesbt, 0, true);
    assert_eq!(round.permissions(), perms);
}
