//!
//! Utility module for the kit.
//!
//! Re-exports amount conversion and address validation helpers for use
//! throughout the codebase.

/// Address format validation
pub mod address;
/// Exact decimal <-> smallest-unit conversion
pub mod amount;

pub use address::{AddressError, address_bytes, validate_address};
pub use amount::{ConvertError, format_token_amount, parse_token_amount};
