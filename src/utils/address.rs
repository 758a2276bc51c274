//! Ethereum address format validation.
//!
//! Checks the textual shape only (`0x` prefix, 40 hex digits). EIP-55
//! checksum verification is deliberately not performed here.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address is missing the 0x prefix: {0}")]
    MissingPrefix(String),

    #[error("address must encode exactly 20 bytes: {0}")]
    InvalidLength(String),

    #[error("address contains non-hex characters: {0}")]
    InvalidHex(String),
}

/// Validate that `address` is a well-formed `0x`-prefixed 20-byte hex string.
pub fn validate_address(address: &str) -> Result<(), AddressError> {
    let hex_part = address
        .strip_prefix("0x")
        .ok_or_else(|| AddressError::MissingPrefix(address.to_string()))?;
    if hex_part.len() != 40 {
        return Err(AddressError::InvalidLength(address.to_string()));
    }
    if !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AddressError::InvalidHex(address.to_string()));
    }
    Ok(())
}

/// Decode a validated address into its raw 20 bytes.
pub fn address_bytes(address: &str) -> Result<[u8; 20], AddressError> {
    validate_address(address)?;
    let mut out = [0u8; 20];
    hex::decode_to_slice(address[2..].to_ascii_lowercase(), &mut out)
        .map_err(|_| AddressError::InvalidHex(address.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    #[test]
    fn accepts_well_formed_addresses() {
        assert!(validate_address(VALID).is_ok());
        assert!(validate_address(&VALID.to_ascii_lowercase()).is_ok());
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(matches!(
            validate_address(&VALID[2..]),
            Err(AddressError::MissingPrefix(_))
        ));
    }

    #[test]
    fn rejects_wrong_length_and_bad_hex() {
        assert!(matches!(
            validate_address("0x1234"),
            Err(AddressError::InvalidLength(_))
        ));
        assert!(matches!(
            validate_address("0xZZ908400098527886E0F7030069857D2E4169EE7"),
            Err(AddressError::InvalidHex(_))
        ));
    }

    #[test]
    fn decodes_to_bytes() {
        let bytes = address_bytes(VALID).unwrap();
        assert_eq!(bytes[0], 0x52);
        assert_eq!(bytes[19], 0xe7);
    }
}
