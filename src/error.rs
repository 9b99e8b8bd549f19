use thiserror::Error;

/// Precondition violations a caller can trigger with ordinary bad input, as opposed to the
/// `debug_assert!`-guarded invariants that are genuine programmer errors (§7).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CapError {
    #[error("requested base {base:#x} is greater than requested top {top:#x}")]
    BaseAfterTop { base: u128, top: u128 },

    #[error("non-monotonic setbounds on a tagged capability: requested [{req_base:#x}, {req_top:#x}) is not contained in [{old_base:#x}, {old_top:#x})")]
    NonMonotonicBounds { old_base: u128, old_top: u128, req_base: u128, req_top: u128 },
}
