//! Permission codec: pack/unpack the architectural permission set into a format's
//! AP/HWPERMS field (§4.7, §6.3).

use bitflags::bitflags;

use crate::bits::{getbits, truncate};
use crate::format::{CompressedCapability, PermCodec};

bitflags! {
    /// The unified architectural permission mask (§6.3). Deliberately flat across every
    /// format - quadrant compression is purely a wire-format concern, handled in this module.
    #[derive(Default)]
    pub struct ArchPerm: u16 {
        const C   = 1 << 0;
        const W   = 1 << 1;
        const R   = 1 << 2;
        const X   = 1 << 3;
        const ASR = 1 << 4;
        const LM  = 1 << 5;
        const EL  = 1 << 6;
        const SL  = 1 << 7;
    }
}

/// Decoded permission state: the architectural mask, the mutability bit, and the number of
/// capability-level bits in effect (0 or 1).
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DecodedPerms {
    pub arch_perm: ArchPerm,
    pub m_bit: bool,
    pub lvbits: u8,
}

/// The most permissive `(arch_perm, m_bit, lvbits)` a format can express - used by
/// `make_max_perms_cap`. For the quadrant codec this is the highest-popcount table entry
/// whose lvbits matches the format's support; for the verbatim/identity codecs it's simply
/// every bit the field can hold.
pub fn max_perms<F: CompressedCapability>() -> DecodedPerms {
    match F::PERM_CODEC {
        PermCodec::Verbatim => DecodedPerms { arch_perm: ArchPerm::all(), m_bit: false, lvbits: 0 },
        PermCodec::Ident => {
            let mut perm = ArchPerm::all();
            if !F::SUPPORTS_LVBITS {
                perm.remove(ArchPerm::EL | ArchPerm::SL);
            }
            DecodedPerms { arch_perm: perm, m_bit: false, lvbits: if F::SUPPORTS_LVBITS { 1 } else { 0 } }
        }
        PermCodec::Quadr => {
            let target_lv = if F::SUPPORTS_LVBITS { 1 } else { 0 };
            quadr_table()
                .iter()
                .filter(|&&(_, _, _, _, lv)| lv == target_lv)
                .max_by_key(|&&(_, _, bits, _, _)| bits.count_ones())
                .map(|&(_, _, bits, m, lv)| DecodedPerms {
                    arch_perm: ArchPerm::from_bits_truncate(bits),
                    m_bit: m,
                    lvbits: lv,
                })
                .unwrap_or_default()
        }
    }
}

/// A quadrant-codec entry: permission set plus mutability/lvbits, reversibly mapped to a
/// 2-bit quadrant selector and a 3-bit sub-encoding.
fn quadr_table() -> &'static [(u8, u8, u16, bool, u8)] {
    use ArchPerm as P;
    &[
        // quadrant, sub-encoding, perm bits, m_bit, lvbits
        (0b00, 0b000, 0, false, 0),
        (0b00, 0b001, P::R.bits(), false, 0),
        (0b00, 0b100, P::W.bits(), false, 0),
        (0b00, 0b101, P::R.bits() | P::W.bits(), false, 0),
        (0b01, 0b000, P::R.bits() | P::W.bits() | P::C.bits() | P::LM.bits() | P::X.bits() | P::ASR.bits() | P::EL.bits() | P::SL.bits(), false, 1),
        (0b01, 0b001, P::R.bits() | P::W.bits() | P::C.bits() | P::LM.bits() | P::X.bits() | P::ASR.bits() | P::EL.bits() | P::SL.bits(), true, 1),
        (0b01, 0b010, P::R.bits() | P::C.bits() | P::LM.bits() | P::X.bits() | P::EL.bits() | P::SL.bits(), false, 1),
        (0b01, 0b100, P::R.bits() | P::W.bits() | P::C.bits() | P::LM.bits() | P::X.bits() | P::EL.bits() | P::SL.bits(), false, 1),
        (0b01, 0b110, P::R.bits() | P::W.bits() | P::X.bits(), false, 0),
        (0b10, 0b011, P::R.bits() | P::C.bits(), false, 0),
        (0b10, 0b110, P::R.bits() | P::W.bits() | P::C.bits() | P::LM.bits() | P::SL.bits(), false, 1),
        (0b10, 0b111, P::R.bits() | P::W.bits() | P::C.bits() | P::LM.bits(), false, 1),
        (0b11, 0b011, P::R.bits() | P::C.bits() | P::LM.bits() | P::EL.bits(), false, 0),
        (0b11, 0b110, P::R.bits() | P::W.bits() | P::C.bits() | P::LM.bits() | P::EL.bits() | P::SL.bits(), false, 1),
        (0b11, 0b111, P::R.bits() | P::W.bits() | P::C.bits() | P::LM.bits() | P::EL.bits(), false, 1),
    ]
}

/// Quadrant/sub-encoding combination reserved to mean "unrepresentable permission set" - a
/// quadrant/sub pair absent from [`quadr_table`].
const RESERVED_QUADR: u128 = 0b00_010;

fn decode_quadr(field: u128) -> DecodedPerms {
    let quadrant = getbits(field, 3, 2) as u8;
    let sub = getbits(field, 0, 3) as u8;
    for &(q, s, bits, m, lv) in quadr_table() {
        if q == quadrant && s == sub {
            return DecodedPerms { arch_perm: ArchPerm::from_bits_truncate(bits), m_bit: m, lvbits: lv };
        }
    }
    DecodedPerms { arch_perm: ArchPerm::empty(), m_bit: false, lvbits: 0 }
}

fn encode_quadr(perms: DecodedPerms) -> u128 {
    let bits = perms.arch_perm.bits();
    for &(q, s, b, m, lv) in quadr_table() {
        if b == bits && m == perms.m_bit && lv == perms.lvbits {
            return ((q as u128) << 3) | (s as u128);
        }
    }
    RESERVED_QUADR
}

/// §4.7 - decode a format's PERMS field into `(arch_perm, m_bit, lvbits)`.
pub fn decode_perms<F: CompressedCapability>(field: u128) -> DecodedPerms {
    let field = truncate(field, F::PERMS_WIDTH);
    match F::PERM_CODEC {
        PermCodec::Verbatim => DecodedPerms {
            arch_perm: ArchPerm::from_bits_truncate(field as u16),
            m_bit: false,
            lvbits: 0,
        },
        PermCodec::Ident => {
            let mut perm = ArchPerm::from_bits_truncate(field as u16);
            if !F::SUPPORTS_LVBITS {
                perm.remove(ArchPerm::EL | ArchPerm::SL);
            }
            DecodedPerms { arch_perm: perm, m_bit: false, lvbits: if F::SUPPORTS_LVBITS { 1 } else { 0 } }
        }
        PermCodec::Quadr => {
            let mut decoded = decode_quadr(field);
            if !F::SUPPORTS_LVBITS {
                decoded.arch_perm.remove(ArchPerm::EL | ArchPerm::SL);
                decoded.lvbits = 0;
            }
            decoded
        }
    }
}

/// §4.7 - encode `(arch_perm, m_bit, lvbits)` into a format's PERMS field.
pub fn encode_perms<F: CompressedCapability>(perms: DecodedPerms) -> u128 {
    match F::PERM_CODEC {
        PermCodec::Verbatim => truncate(perms.arch_perm.bits() as u128, F::PERMS_WIDTH),
        PermCodec::Ident => {
            let mut perm = perms.arch_perm;
            if !F::SUPPORTS_LVBITS {
                perm.remove(ArchPerm::EL | ArchPerm::SL);
            }
            truncate(perm.bits() as u128, F::PERMS_WIDTH)
        }
        PermCodec::Quadr => encode_quadr(perms),
    }
}
