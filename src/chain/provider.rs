//! HTTP provider with multi-RPC failover
//!
//! Wraps one or more JSON-RPC endpoints behind the [`ChainRpc`] seam. Reads
//! rotate to the next endpoint on transport failure; node-level rejections
//! are returned as-is, since every endpoint would give the same verdict.

use super::ChainRpc;
use crate::config::ChainConfig;
use crate::error::{ClientError, ClientResult};

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider, ProviderError};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, BlockNumber, Bytes, TransactionReceipt, H256, U256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Multi-endpoint provider with automatic failover
pub struct ChainProvider {
    config: ChainConfig,
    http_providers: Vec<Provider<Http>>,
    current_provider: AtomicUsize,
}

impl ChainProvider {
    /// Create a new chain provider
    pub fn new(config: ChainConfig) -> ClientResult<Self> {
        let mut http_providers = Vec::new();

        for url in &config.rpc_urls {
            match Provider::<Http>::try_from(url.as_str()) {
                Ok(provider) => {
                    let provider = provider.interval(Duration::from_millis(100));
                    http_providers.push(provider);
                    debug!("Added HTTP provider for chain {}: {}", config.chain_id, url);
                }
                Err(e) => {
                    warn!("Failed to create provider for {}: {}", url, e);
                }
            }
        }

        if http_providers.is_empty() {
            return Err(ClientError::Config(format!(
                "No valid RPC providers for chain {}",
                config.chain_id
            )));
        }

        Ok(Self {
            config,
            http_providers,
            current_provider: AtomicUsize::new(0),
        })
    }

    /// Get the active HTTP provider
    fn http(&self) -> &Provider<Http> {
        let idx = self.current_provider.load(Ordering::Relaxed);
        &self.http_providers[idx % self.http_providers.len()]
    }

    /// Switch to next available provider
    fn failover(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.http_providers.len();
        self.current_provider.store(next, Ordering::Relaxed);
        warn!(
            "Chain {} failover to provider {}",
            self.config.chain_id, next
        );
    }

    /// Get chain ID
    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }
}

/// Map a provider error onto the client error taxonomy. An error payload in
/// the RPC response is a node verdict; everything else is transport.
fn classify(e: ProviderError) -> ClientError {
    if let ProviderError::JsonRpcClientError(inner) = &e {
        if let Some(rpc_err) = inner.as_error_response() {
            return ClientError::RpcLogic(rpc_err.message.clone());
        }
    }
    ClientError::RpcTransport(e.to_string())
}

#[async_trait]
impl ChainRpc for ChainProvider {
    async fn latest_base_fee(&self) -> ClientResult<Option<U256>> {
        let mut last_error = None;
        for _ in 0..self.http_providers.len() {
            match self.http().get_block(BlockNumber::Latest).await {
                Ok(block) => return Ok(block.and_then(|b| b.base_fee_per_gas)),
                Err(e) => {
                    let e = classify(e);
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    self.failover();
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            ClientError::RpcTransport("all providers failed".to_string())
        }))
    }

    async fn gas_price(&self) -> ClientResult<U256> {
        self.http().get_gas_price().await.map_err(classify)
    }

    async fn estimate_gas(&self, tx: TypedTransaction) -> ClientResult<U256> {
        self.http()
            .estimate_gas(&tx, None)
            .await
            .map_err(|e| ClientError::GasEstimation(e.to_string()))
    }

    async fn transaction_count(&self, address: Address) -> ClientResult<u64> {
        let nonce = self
            .http()
            .get_transaction_count(address, None)
            .await
            .map_err(classify)?;
        Ok(nonce.as_u64())
    }

    async fn balance(&self, address: Address) -> ClientResult<U256> {
        self.http()
            .get_balance(address, None)
            .await
            .map_err(classify)
    }

    async fn send_raw_transaction(&self, payload: Bytes) -> ClientResult<H256> {
        // Single attempt per call: the submitter owns the retry policy.
        // Advance the endpoint on transport failure so a retry lands elsewhere.
        match self.http().send_raw_transaction(payload).await {
            Ok(pending) => Ok(pending.tx_hash()),
            Err(e) => {
                let e = classify(e);
                if e.is_retryable() {
                    self.failover();
                }
                Err(e)
            }
        }
    }

    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> ClientResult<Option<TransactionReceipt>> {
        let mut last_error = None;
        for _ in 0..self.http_providers.len() {
            match self.http().get_transaction_receipt(tx_hash).await {
                Ok(receipt) => return Ok(receipt),
                Err(e) => {
                    let e = classify(e);
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    self.failover();
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            ClientError::RpcTransport("all providers failed".to_string())
        }))
    }

    async fn call(&self, tx: TypedTransaction) -> ClientResult<Bytes> {
        self.http().call(&tx, None).await.map_err(classify)
    }
}
