//! Shared DTOs (schemas-as-code) for the desourcify workspace.
//!
//! # Design constraints
//! - Scan and apply reports are intended to be serialized to disk.
//! - Be conservative with breaking changes.
//! - Prefer adding optional fields over changing semantics.

pub mod apply;
pub mod checkout;
pub mod scan;
pub mod tool;

/// Schema identifiers.
pub mod schema {
    pub const DESOURCIFY_SCAN_V1: &str = "desourcify.scan.v1";
    pub const DESOURCIFY_APPLY_V1: &str = "desourcify.apply.v1";
}
