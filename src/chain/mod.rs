//! Chain access layer: the JSON-RPC seam and the HTTP provider behind it

mod provider;

pub use provider::ChainProvider;

use crate::error::ClientResult;

use async_trait::async_trait;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionReceipt, H256, U256};

/// The node operations the client depends on. Everything above this trait is
/// network-free, which keeps the submission flow testable without an RPC
/// endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Base fee of the latest block; None on a pre-1559 chain
    async fn latest_base_fee(&self) -> ClientResult<Option<U256>>;

    /// Current legacy gas price
    async fn gas_price(&self) -> ClientResult<U256>;

    /// Gas estimate for a candidate transaction
    async fn estimate_gas(&self, tx: TypedTransaction) -> ClientResult<U256>;

    /// On-chain transaction count for an account
    async fn transaction_count(&self, address: Address) -> ClientResult<u64>;

    /// Native-token balance in wei
    async fn balance(&self, address: Address) -> ClientResult<U256>;

    /// Broadcast a signed payload, returning the transaction hash
    async fn send_raw_transaction(&self, payload: Bytes) -> ClientResult<H256>;

    /// Receipt for a submitted transaction, if mined
    async fn transaction_receipt(&self, tx_hash: H256)
        -> ClientResult<Option<TransactionReceipt>>;

    /// Read-only contract call
    async fn call(&self, tx: TypedTransaction) -> ClientResult<Bytes>;
}
