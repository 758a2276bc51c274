//! Signing capability interface.
//!
//! Key derivation, mnemonic handling, and the signing math live behind this
//! trait; the kit only needs an address and a way to turn an unsigned
//! transaction into a broadcastable payload.

use crate::transaction::UnsignedTransaction;
use thiserror::Error;

/// An opaque wallet able to derive the account address and sign
/// transactions. The address is immutable for the kit instance's lifetime.
pub trait Wallet: Send + Sync {
    /// The account's receive address.
    fn address(&self) -> String;

    /// Sign an unsigned transaction, returning the raw broadcastable
    /// payload.
    fn sign(&self, transaction: &UnsignedTransaction) -> Result<Vec<u8>, SigningError>;
}

/// The wallet refused or failed to sign.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("signer rejected the transaction: {0}")]
    Rejected(String),
}
