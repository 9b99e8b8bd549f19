use std::fmt::Debug;
use num_traits::{Num, NumCast, ToPrimitive};

/// Trait bound for the address/length/offset types exposed at a format's public API boundary.
///
/// Every format computes internally in `u128` (see [`crate::bits`]) and narrows to this type
/// only when crossing the public API - this trait is what lets that narrowing be written once,
/// generically, instead of once per format.
pub trait NumType:
    Default + Num + NumCast + ToPrimitive + Copy + Clone + Debug + PartialOrd + Ord + 'static
{
}
impl NumType for u32 {}
impl NumType for u64 {}
impl NumType for u128 {}

/// Widen a format-native value to the internal `u128` working type.
pub fn widen<N: NumType>(v: N) -> u128 {
    v.to_u128().expect("NumType impls are all losslessly representable in u128")
}

/// Narrow a `u128` back down to a format-native type, truncating high bits.
///
/// This mirrors the source's habit of computing in "the next-wider integer type" and truncating
/// on the way out; the truncation here is explicit instead of implicit in a C integer conversion.
pub fn narrow<N: NumType>(v: u128, width: u32) -> N {
    let mask = if width >= 128 { u128::MAX } else { (1u128 << width) - 1 };
    NumCast::from(v & mask).expect("masked value fits in the target width")
}
