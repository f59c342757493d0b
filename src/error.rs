//! Error types for the GameChain client

use ethers::types::{H256, U256};
use thiserror::Error;

/// Main error type for the client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No wallet session available")]
    WalletUnavailable,

    #[error("Wallet has no linked account")]
    AddressUnavailable,

    #[error("Insufficient balance: have {have} wei, need {need} wei")]
    InsufficientBalance { have: U256, need: U256 },

    #[error("Gas estimation error: {0}")]
    GasEstimation(String),

    #[error("Gas pricing error: {0}")]
    GasPricing(String),

    #[error("RPC transport error: {0}")]
    RpcTransport(String),

    #[error("Node rejected request: {0}")]
    RpcLogic(String),

    #[error("Transaction {tx_hash:?} reverted")]
    Reverted { tx_hash: H256 },

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("Contract call error: {0}")]
    Contract(String),
}

impl ClientError {
    /// Check if error is retryable. Only transport-class failures qualify;
    /// node-level rejections carry a verdict and must not be resent.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::RpcTransport(_) | ClientError::Timeout { .. }
        )
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
