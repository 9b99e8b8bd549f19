//! Public API surface (§4.8): the decompressed [`CcxCap`] value type and the operations that
//! construct, inspect and mutate it.

use crate::bits::{getbits, setbits, truncate};
use crate::bounds::{compute_base_top, extract_bounds_bits};
use crate::ebt;
use crate::error::CapError;
use crate::format::CompressedCapability;
use crate::num::{narrow, widen};
use crate::perms::{self, ArchPerm, DecodedPerms};
use crate::repr;

/// A decompressed capability (§3.1). Generic over the format it was decoded under - a
/// `CcxCap<RiscV64>` and a `CcxCap<Morello>` are distinct types and cannot be confused.
#[derive(Debug, Copy, Clone)]
pub struct CcxCap<F: CompressedCapability> {
    cursor: F::Addr,
    pesbt: F::Addr,
    base: F::Addr,
    top: F::Length,
    tag: bool,
    bounds_valid: bool,
    exp: i32,
    arch_perm: ArchPerm,
    m_bit: bool,
    lvbits: u8,
    extra: u8,
}

impl<F: CompressedCapability> Default for CcxCap<F> {
    fn default() -> Self {
        CcxCap {
            cursor: Default::default(),
            pesbt: Default::default(),
            base: Default::default(),
            top: Default::default(),
            tag: false,
            bounds_valid: false,
            exp: 0,
            arch_perm: ArchPerm::empty(),
            m_bit: false,
            lvbits: 0,
            extra: 0,
        }
    }
}

impl<F: CompressedCapability> PartialEq for CcxCap<F> {
    fn eq(&self, other: &Self) -> bool {
        exactly_equal(self, other)
    }
}
impl<F: CompressedCapability> Eq for CcxCap<F> {}

impl<F: CompressedCapability> CcxCap<F> {
    // --- accessors ---

    pub fn tag(&self) -> bool {
        self.tag
    }
    pub fn set_tag(&mut self, tag: bool) {
        self.tag = tag;
    }
    pub fn bounds_valid(&self) -> bool {
        self.bounds_valid
    }
    pub fn base(&self) -> F::Addr {
        self.base
    }
    pub fn top(&self) -> F::Length {
        self.top
    }
    pub fn bounds(&self) -> (F::Addr, F::Length) {
        (self.base, self.top)
    }
    pub fn address(&self) -> F::Addr {
        self.cursor
    }
    pub fn exp(&self) -> i32 {
        self.exp
    }
    pub fn lvbits(&self) -> u8 {
        self.lvbits
    }
    pub fn m_bit(&self) -> bool {
        self.m_bit
    }
    pub fn extra(&self) -> u8 {
        self.extra
    }
    pub fn set_extra(&mut self, extra: u8) {
        self.extra = extra;
    }

    pub fn offset(&self) -> F::Offset {
        let cursor = widen(self.cursor);
        let base = widen(self.base);
        narrow(cursor.wrapping_sub(base), F::ADDR_WIDTH)
    }
    pub fn length(&self) -> F::Length {
        let top = widen(self.top);
        let base = widen(self.base);
        narrow(top.wrapping_sub(base), F::ADDR_WIDTH + 1)
    }

    pub fn software_permissions(&self) -> u32 {
        getbits(widen(self.pesbt), F::UPERMS_OFFSET, F::UPERMS_WIDTH) as u32
    }
    pub fn set_software_permissions(&mut self, uperms: u32) {
        self.pesbt = narrow(
            setbits(widen(self.pesbt), F::UPERMS_OFFSET, F::UPERMS_WIDTH, uperms as u128),
            F::ADDR_WIDTH,
        );
    }

    pub fn permissions(&self) -> ArchPerm {
        self.arch_perm
    }
    pub fn set_permissions(&mut self, perms: ArchPerm) {
        self.arch_perm = perms;
        self.sync_perms_field();
    }

    pub fn otype(&self) -> u32 {
        getbits(widen(self.pesbt), F::OTYPE_OFFSET, F::OTYPE_WIDTH) as u32
    }
    pub fn is_sealed(&self) -> bool {
        self.otype() != F::OTYPE_UNSEALED
    }
    pub fn set_otype(&mut self, otype: u32) {
        self.pesbt = narrow(
            setbits(widen(self.pesbt), F::OTYPE_OFFSET, F::OTYPE_WIDTH, otype as u128),
            F::ADDR_WIDTH,
        );
    }

    pub fn reserved_bits(&self) -> u8 {
        getbits(widen(self.pesbt), F::RESERVED_OFFSET, F::RESERVED_WIDTH) as u8
    }
    pub fn set_reserved_bits(&mut self, bits: u8) {
        self.pesbt = narrow(
            setbits(widen(self.pesbt), F::RESERVED_OFFSET, F::RESERVED_WIDTH, bits as u128),
            F::ADDR_WIDTH,
        );
    }

    pub fn flags(&self) -> u8 {
        getbits(widen(self.pesbt), F::FLAGS_OFFSET, F::FLAGS_WIDTH) as u8
    }
    pub fn set_flags(&mut self, flags: u8) {
        self.pesbt = narrow(
            setbits(widen(self.pesbt), F::FLAGS_OFFSET, F::FLAGS_WIDTH, flags as u128),
            F::ADDR_WIDTH,
        );
    }

    /// Check if an arbitrary object's address range lies within this capability's bounds.
    pub fn addr_in_bounds(&self, addr: F::Addr, obj_size: F::Addr) -> bool {
        let addr = widen(addr);
        let end = addr + widen(obj_size);
        addr >= widen(self.base) && end <= widen(self.top)
    }

    fn sync_perms_field(&mut self) {
        let decoded = DecodedPerms { arch_perm: self.arch_perm, m_bit: self.m_bit, lvbits: self.lvbits };
        let field = perms::encode_perms::<F>(decoded);
        self.pesbt = narrow(setbits(widen(self.pesbt), F::PERMS_OFFSET, F::PERMS_WIDTH, field), F::ADDR_WIDTH);
    }

    // --- constructors ---

    /// §4.8 `decompress_raw`. Does not apply the memory XOR mask - use [`Self::decompress_mem`]
    /// when decoding a word straight out of memory.
    pub fn decompress_raw(pesbt: F::Addr, cursor: F::Addr, tag: bool) -> Self {
        let pesbt_w = widen(pesbt);
        let cursor_w = widen(cursor);

        let bits = extract_bounds_bits::<F>(pesbt_w);
        let bt = compute_base_top::<F>(&bits, cursor_w);
        let perms_field = getbits(pesbt_w, F::PERMS_OFFSET, F::PERMS_WIDTH);
        let decoded = crate::perms::decode_perms::<F>(perms_field);

        if tag && !bt.valid {
            tracing::trace!(target: "cheri_compressed_cap", "decompressed a malformed bit pattern under a tagged capability");
        }

        CcxCap {
            cursor,
            pesbt,
            base: narrow(bt.base, F::ADDR_WIDTH),
            top: narrow(bt.top, F::ADDR_WIDTH + 1),
            tag,
            bounds_valid: bt.valid,
            exp: bits.e,
            arch_perm: decoded.arch_perm,
            m_bit: decoded.m_bit,
            lvbits: decoded.lvbits,
            extra: 0,
        }
    }

    /// §4.8 `decompress_mem` - applies the format's NULL_XOR_MASK first.
    pub fn decompress_mem(pesbt_raw: F::Addr, cursor: F::Addr, tag: bool) -> Self {
        let unmasked = widen(pesbt_raw) ^ F::null_xor_mask();
        Self::decompress_raw(narrow(unmasked, F::ADDR_WIDTH), cursor, tag)
    }

    /// §4.8 `make_null_derived_cap` - the capability freshly zeroed memory with a non-zero
    /// cursor decodes to.
    pub fn make_null_derived_cap(addr: F::Addr) -> Self {
        Self::decompress_mem(F::Addr::default(), addr, false)
    }

    /// §4.8 `try_make_max_perms_cap`: fallible constructor reporting `base > top` instead of
    /// panicking.
    pub fn try_make_max_perms_cap(base: F::Addr, cursor: F::Addr, top: F::Length) -> Result<Self, CapError> {
        let req_base = widen(base);
        let req_top = widen(top);
        if req_base > req_top {
            return Err(CapError::BaseAfterTop { base: req_base, top: req_top });
        }

        let max_perms = perms::max_perms::<F>();
        let perms_field = perms::encode_perms::<F>(max_perms);
        let uperms_field: u128 = (1u128 << F::UPERMS_WIDTH).wrapping_sub(1);
        let cl_field: u128 = max_perms.lvbits as u128;

        let enc = ebt::compute_ebt::<F>(req_base, req_top);
        debug_assert!(enc.exact, "make_max_perms_cap requires an exactly representable interval");

        let mut pesbt: u128 = 0;
        pesbt = setbits(pesbt, F::UPERMS_OFFSET, F::UPERMS_WIDTH, uperms_field);
        pesbt = setbits(pesbt, F::PERMS_OFFSET, F::PERMS_WIDTH, perms_field);
        pesbt = setbits(pesbt, F::CL_OFFSET, F::CL_WIDTH, cl_field);
        pesbt = setbits(pesbt, F::OTYPE_OFFSET, F::OTYPE_WIDTH, F::OTYPE_UNSEALED as u128);
        pesbt = setbits(pesbt, F::EBT_OFFSET, F::EBT_WIDTH, enc.ebt);

        Ok(Self::decompress_raw(narrow(pesbt, F::ADDR_WIDTH), cursor, true))
    }

    /// §4.8 `make_max_perms_cap` - panics if `base > top`.
    pub fn make_max_perms_cap(base: F::Addr, cursor: F::Addr, top: F::Length) -> Self {
        Self::try_make_max_perms_cap(base, cursor, top)
            .expect("make_max_perms_cap requires base <= top")
    }

    // --- mutators ---

    /// §4.6 `set_bounds` - rounds `[cursor, cursor + req_len)` outward to a representable
    /// interval, clearing the tag if the request would enlarge the capability. Returns whether
    /// the rounding was exact.
    pub fn set_bounds(&mut self, req_len: F::Length) -> bool {
        if self.is_sealed() {
            self.tag = false;
        }

        let req_base = truncate(widen(self.cursor), F::ADDR_WIDTH);
        let req_top = truncate(req_base + widen(req_len), F::ADDR_WIDTH + 1);
        let old_base = widen(self.base);
        let old_top = widen(self.top);

        if req_base < old_base || req_top > old_top {
            self.tag = false;
            tracing::trace!(target: "cheri_compressed_cap", "set_bounds requested an enlarging interval, clearing tag");
        }

        let enc = ebt::compute_ebt::<F>(req_base, req_top);
        self.pesbt = narrow(setbits(widen(self.pesbt), F::EBT_OFFSET, F::EBT_WIDTH, enc.ebt), F::ADDR_WIDTH);

        let bits = extract_bounds_bits::<F>(widen(self.pesbt));
        let bt = compute_base_top::<F>(&bits, widen(self.cursor));
        self.base = narrow(bt.base, F::ADDR_WIDTH);
        self.top = narrow(bt.top, F::ADDR_WIDTH + 1);
        self.bounds_valid = bt.valid;
        self.exp = bits.e;

        enc.exact
    }

    /// §4.6 `checked_set_bounds` - like [`Self::set_bounds`], but reports non-monotonic
    /// requests against an already-tagged capability instead of silently clearing the tag.
    pub fn checked_set_bounds(&mut self, req_len: F::Length) -> Result<bool, CapError> {
        if self.tag {
            let req_base = truncate(widen(self.cursor), F::ADDR_WIDTH);
            let req_top = truncate(req_base + widen(req_len), F::ADDR_WIDTH + 1);
            let old_base = widen(self.base);
            let old_top = widen(self.top);
            if req_base < old_base || req_top > old_top {
                return Err(CapError::NonMonotonicBounds { old_base, old_top, req_base, req_top });
            }
        }
        Ok(self.set_bounds(req_len))
    }

    /// §4.6 `set_address` - installs `new_addr` as the cursor, clearing the tag (and
    /// re-deriving bounds from the new cursor) if the move leaves the representable region.
    pub fn set_address(&mut self, new_addr: F::Addr) {
        if self.is_sealed() && self.tag {
            self.tag = false;
        }

        let pesbt_w = widen(self.pesbt);
        let base_w = widen(self.base);
        let top_w = widen(self.top);
        let new_w = widen(new_addr);

        let representable = if F::USES_EF {
            repr::precise_is_representable_new_addr::<F>(pesbt_w, base_w, top_w, new_w)
        } else {
            repr::fast_is_representable_new_addr::<F>(pesbt_w, widen(self.cursor), new_w, base_w, top_w)
        };

        if F::IS_MORELLO && self.bounds_uses_cursor_value() && repr::cap_sign_change::<F>(widen(self.cursor), new_w) {
            self.tag = false;
        }

        if !representable {
            self.tag = false;
            tracing::debug!(target: "cheri_compressed_cap", "set_address left the representable region, clearing tag");
            let bits = extract_bounds_bits::<F>(pesbt_w);
            let bt = compute_base_top::<F>(&bits, new_w);
            self.base = narrow(bt.base, F::ADDR_WIDTH);
            self.top = narrow(bt.top, F::ADDR_WIDTH + 1);
            self.bounds_valid = bt.valid;
            self.exp = bits.e;
        }

        self.cursor = new_addr;
    }

    fn bounds_uses_cursor_value(&self) -> bool {
        (self.exp as u32) < F::MAX_ENCODABLE_EXPONENT
    }

    /// §4.8 `is_representable_cap_exact` - round-trips through compress/decompress and checks
    /// that decoded bounds survive.
    pub fn is_representable_cap_exact(&self) -> bool {
        let round = Self::decompress_raw(self.compress_raw(), self.cursor, self.tag);
        round.base == self.base && round.top == self.top
    }

    pub fn is_representable_with_new_addr(&self, new_addr: F::Addr) -> bool {
        let pesbt_w = widen(self.pesbt);
        let base_w = widen(self.base);
        let top_w = widen(self.top);
        if F::USES_EF {
            repr::precise_is_representable_new_addr::<F>(pesbt_w, base_w, top_w, widen(new_addr))
        } else {
            repr::fast_is_representable_new_addr::<F>(pesbt_w, widen(self.cursor), widen(new_addr), base_w, top_w)
        }
    }

    // --- serialisation ---

    /// §4.8 `compress_raw`. `pesbt` is kept in sync by every mutator, so this is just an
    /// accessor - there is no separate "recompute EBT from base/top" step.
    pub fn compress_raw(&self) -> F::Addr {
        self.pesbt
    }

    /// §4.8 `compress_mem` - applies the format's NULL_XOR_MASK before returning.
    pub fn compress_mem(&self) -> F::Addr {
        narrow(widen(self.pesbt) ^ F::null_xor_mask(), F::ADDR_WIDTH)
    }
}

/// §4.8 `get_alignment_mask`.
pub fn get_alignment_mask<F: CompressedCapability>(length: F::Length) -> F::Length {
    narrow(ebt::get_alignment_mask::<F>(widen(length)), F::ADDR_WIDTH)
}
/// §4.8 `get_required_alignment`.
pub fn get_required_alignment<F: CompressedCapability>(length: F::Length) -> F::Length {
    narrow(ebt::get_required_alignment::<F>(widen(length)), F::ADDR_WIDTH)
}
/// §4.8 `get_representable_length`.
pub fn get_representable_length<F: CompressedCapability>(length: F::Length) -> F::Length {
    narrow(ebt::get_representable_length::<F>(widen(length)), F::ADDR_WIDTH)
}

/// §4.8 `exactly_equal` - tag, cursor and pesbt equal (the raw wire representation matches).
pub fn exactly_equal<F: CompressedCapability>(a: &CcxCap<F>, b: &CcxCap<F>) -> bool {
    a.tag == b.tag && a.cursor == b.cursor && a.pesbt == b.pesbt
}

/// §4.8 `raw_equal` - all decoded fields equal, `extra` excluded.
pub fn raw_equal<F: CompressedCapability>(a: &CcxCap<F>, b: &CcxCap<F>) -> bool {
    a.tag == b.tag
        && a.cursor == b.cursor
        && a.base == b.base
        && a.top == b.top
        && a.exp == b.exp
        && a.arch_perm == b.arch_perm
        && a.m_bit == b.m_bit
        && a.lvbits == b.lvbits
}
