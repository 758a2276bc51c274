//! Call-data encoding for the ERC-20 `transfer` function.

use crate::utils::{AddressError, address_bytes};

/// Function selector for `transfer(address,uint256)`.
const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Encode the call data for `transfer(recipient, amount)`: the 4-byte
/// selector followed by two left-padded 32-byte words.
pub fn transfer_call_data(recipient: &str, amount: u128) -> Result<Vec<u8>, AddressError> {
    let recipient = address_bytes(recipient)?;

    let mut data = Vec::with_capacity(4 + 64);
    data.extend_from_slice(&TRANSFER_SELECTOR);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(&recipient);
    data.extend_from_slice(&[0u8; 16]);
    data.extend_from_slice(&amount.to_be_bytes());
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_selector_and_padded_words() {
        let data =
            transfer_call_data("0x52908400098527886E0F7030069857D2E4169EE7", 1_000).unwrap();
        let hex = hex::encode(&data);
        assert_eq!(&hex[..8], "a9059cbb");
        assert_eq!(
            &hex[8..72],
            "00000000000000000000000052908400098527886e0f7030069857d2e4169ee7"
        );
        assert_eq!(
            &hex[72..],
            "00000000000000000000000000000000000000000000000000000000000003e8"
        );
        assert_eq!(data.len(), 68);
    }

    #[test]
    fn rejects_malformed_recipients() {
        assert!(transfer_call_data("not-an-address", 1).is_err());
    }
}
