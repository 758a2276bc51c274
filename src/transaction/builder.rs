//! Transfer construction pipeline.
//!
//! Both variants follow the same shape: acquire the pending nonce, resolve
//! the fee price (caller-supplied or cached), scale the decimal amount to
//! the smallest unit, build and sign the payload, broadcast, and finally
//! record the sent transaction optimistically so it appears in history
//! before the chain confirms it. Any failure before the broadcast leaves
//! all persisted state untouched.

use crate::provider::{ChainProvider, ProviderError};
use crate::store::{DEFAULT_GAS_PRICE, LedgerStore, StoreError, TransactionRecord};
use crate::transaction::{
    ERC20_GAS_LIMIT, ETH_DECIMALS, ETH_GAS_LIMIT, UnsignedTransaction, erc20,
};
use crate::utils::{AddressError, ConvertError, format_token_amount, parse_token_amount, validate_address};
use crate::wallet::{SigningError, Wallet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error types for the send pipeline. Delivered to the caller that
/// requested the operation; sync-path errors never surface here.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("invalid address: {0}")]
    Address(#[from] AddressError),

    #[error("token contract is not registered: {0}")]
    ContractNotRegistered(String),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("signing error: {0}")]
    Signing(#[from] SigningError),
}

/// Builds, signs, broadcasts, and optimistically records transfers.
pub struct TransactionBuilder {
    wallet: Arc<dyn Wallet>,
    provider: Arc<dyn ChainProvider>,
    store: Arc<dyn LedgerStore>,
}

impl TransactionBuilder {
    pub fn new(
        wallet: Arc<dyn Wallet>,
        provider: Arc<dyn ChainProvider>,
        store: Arc<dyn LedgerStore>,
    ) -> Self {
        Self {
            wallet,
            provider,
            store,
        }
    }

    /// Send `amount` ETH (a decimal string) to `to`.
    pub async fn send(
        &self,
        to: &str,
        amount: &str,
        gas_price: Option<u64>,
    ) -> Result<TransactionRecord, SendError> {
        validate_address(to)?;
        let from = self.wallet.address();

        let nonce = self.provider.pending_nonce(&from).await?;
        let gas_price = self.resolve_gas_price(gas_price).await;
        let value = parse_token_amount(amount, ETH_DECIMALS)?;

        let unsigned = UnsignedTransaction {
            nonce,
            to: to.to_string(),
            value,
            gas_limit: ETH_GAS_LIMIT,
            gas_price,
            data: Vec::new(),
        };
        let payload = self.wallet.sign(&unsigned)?;
        let hash = self.provider.broadcast(&payload).await?;
        info!("broadcast native transfer {hash}");

        self.record_sent(TransactionRecord {
            hash,
            from,
            to: to.to_string(),
            contract_address: String::new(),
            value,
            gas_limit: ETH_GAS_LIMIT,
            gas_price,
            nonce,
            block_number: 0,
            timestamp: now(),
            input: String::new(),
            invalid: false,
        })
        .await
    }

    /// Send `amount` of the token at `contract_address` (scaled with the
    /// token's own `decimals`) to `to`.
    pub async fn send_erc20(
        &self,
        to: &str,
        contract_address: &str,
        decimals: u32,
        amount: &str,
        gas_price: Option<u64>,
    ) -> Result<TransactionRecord, SendError> {
        validate_address(to)?;
        validate_address(contract_address)?;
        let from = self.wallet.address();

        let nonce = self.provider.pending_nonce(&from).await?;
        let gas_price = self.resolve_gas_price(gas_price).await;
        let value = parse_token_amount(amount, decimals)?;
        let data = erc20::transfer_call_data(to, value)?;

        let unsigned = UnsignedTransaction {
            nonce,
            to: contract_address.to_string(),
            value: 0,
            gas_limit: ERC20_GAS_LIMIT,
            gas_price,
            data: data.clone(),
        };
        let payload = self.wallet.sign(&unsigned)?;
        let hash = self.provider.broadcast(&payload).await?;
        info!("broadcast token transfer {hash} via {contract_address}");

        self.record_sent(TransactionRecord {
            hash,
            from,
            to: to.to_string(),
            contract_address: contract_address.to_string(),
            value,
            gas_limit: ERC20_GAS_LIMIT,
            gas_price,
            nonce,
            block_number: 0,
            timestamp: now(),
            input: format!("0x{}", hex::encode(&data)),
            invalid: false,
        })
        .await
    }

    /// Upper-bound fee estimate for a plain value transfer, in ETH.
    pub async fn fee(&self) -> Result<String, StoreError> {
        self.estimate(ETH_GAS_LIMIT).await
    }

    /// Upper-bound fee estimate for an ERC-20 transfer, in ETH.
    pub async fn erc20_fee(&self) -> Result<String, StoreError> {
        self.estimate(ERC20_GAS_LIMIT).await
    }

    async fn estimate(&self, gas_limit: u64) -> Result<String, StoreError> {
        let gas_price = self.store.gas_price().await?;
        Ok(format_token_amount(
            u128::from(gas_price) * u128::from(gas_limit),
            ETH_DECIMALS,
        ))
    }

    async fn resolve_gas_price(&self, requested: Option<u64>) -> u64 {
        match requested {
            Some(price) => price,
            None => self.store.gas_price().await.unwrap_or(DEFAULT_GAS_PRICE),
        }
    }

    /// The optimistic-recording step. The broadcast already succeeded, so a
    /// store failure here is logged rather than returned; the refresh cycle
    /// will pick the transaction up from the chain.
    async fn record_sent(
        &self,
        record: TransactionRecord,
    ) -> Result<TransactionRecord, SendError> {
        match self.store.insert_transaction_if_absent(record.clone()).await {
            Ok(true) => {}
            Ok(false) => debug!("sent transaction already recorded"),
            Err(e) => warn!("failed to record sent transaction: {e}"),
        }
        Ok(record)
    }
}

fn now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
