//! Transaction submission: sign, broadcast with bounded retries, await receipt
//!
//! A single flow moves through `Built -> Signed -> Submitted -> (Confirmed |
//! Reverted | Failed)`. Signing is never skipped, `Submitted` is entered only
//! once the node returns a hash, and `Failed` is terminal: the error both
//! propagates to the caller and fires a failure notification.

use super::gas::{GasEstimator, GasPlan};
use crate::chain::ChainRpc;
use crate::config::{ChainConfig, SubmitterConfig};
use crate::error::{ClientError, ClientResult};
use crate::game::GameOp;
use crate::notify::{explorer_link, Notification, NotificationSink};
use crate::wallet::TransactionSigner;

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, H256};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Phase of a single transaction flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxPhase {
    Built,
    Signed,
    Submitted,
}

impl fmt::Display for TxPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxPhase::Built => "built",
            TxPhase::Signed => "signed",
            TxPhase::Submitted => "submitted",
        };
        f.write_str(name)
    }
}

/// Terminal status of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Reverted,
}

/// A fully-specified submission request, consumed exactly once
#[derive(Debug, Clone)]
pub struct TxRequest {
    pub to: Address,
    pub data: Bytes,
    pub nonce: u64,
    /// Pre-resolved gas plan; resolved from network state when absent
    pub gas: Option<GasPlan>,
    pub op: GameOp,
}

/// Outcome of a confirmed submission
#[derive(Debug, Clone, Copy)]
pub struct TransactionResult {
    pub tx_hash: H256,
    pub status: TxStatus,
}

/// Transaction submitter with retry and notification handling
pub struct TransactionSubmitter {
    rpc: Arc<dyn ChainRpc>,
    signer: Arc<dyn TransactionSigner>,
    notifier: Arc<dyn NotificationSink>,
    gas_estimator: GasEstimator,
    config: SubmitterConfig,
    chain_id: u64,
    explorer_url: String,
}

impl TransactionSubmitter {
    /// Create a new transaction submitter
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        signer: Arc<dyn TransactionSigner>,
        notifier: Arc<dyn NotificationSink>,
        submitter_config: &SubmitterConfig,
        chain_config: &ChainConfig,
    ) -> Self {
        Self {
            rpc,
            signer,
            notifier,
            gas_estimator: GasEstimator::new(submitter_config, chain_config),
            config: submitter_config.clone(),
            chain_id: chain_config.chain_id,
            explorer_url: chain_config.explorer_url.clone(),
        }
    }

    /// Resolve a gas plan for a candidate call. Both halves recover locally,
    /// so this never errors.
    pub async fn plan_gas(&self, to: Address, data: Bytes, op: GameOp) -> GasPlan {
        let fees = self.gas_estimator.resolve_pricing(self.rpc.as_ref()).await;

        let candidate: TypedTransaction = Eip1559TransactionRequest::new()
            .from(self.signer.address())
            .to(to)
            .data(data)
            .into();
        let gas_limit = self
            .gas_estimator
            .estimate_limit(self.rpc.as_ref(), candidate, op)
            .await;

        GasPlan { gas_limit, fees }
    }

    /// Run the full submission flow and wait for a terminal receipt status.
    /// Any failure fires a failure notification before propagating.
    pub async fn submit_and_confirm(&self, request: TxRequest) -> ClientResult<TransactionResult> {
        let started = Instant::now();
        match self.run_flow(request, started).await {
            Ok(result) => Ok(result),
            Err(e) => {
                self.notifier
                    .notify(Notification::failed(format!("Transaction failed: {}", e)));
                Err(e)
            }
        }
    }

    async fn run_flow(
        &self,
        request: TxRequest,
        started: Instant,
    ) -> ClientResult<TransactionResult> {
        let plan = match request.gas {
            Some(plan) => plan,
            None => {
                self.plan_gas(request.to, request.data.clone(), request.op)
                    .await
            }
        };

        let tx = self.build_tx(&request, &plan);
        debug!(phase = %TxPhase::Built, nonce = request.nonce, op = %request.op, "transaction built");

        let payload = self.signer.sign_transaction(tx).await?;
        debug!(phase = %TxPhase::Signed, nonce = request.nonce, "transaction signed");

        let tx_hash = self.send_with_retry(payload).await?;
        info!(phase = %TxPhase::Submitted, tx_hash = ?tx_hash, "transaction submitted");

        let link = explorer_link(&self.explorer_url, tx_hash);
        self.notifier.notify(Notification::submitted(
            format!(
                "Transaction submitted after {:.1}s",
                started.elapsed().as_secs_f64()
            ),
            link.clone(),
        ));

        let status = self.await_receipt(tx_hash).await?;
        if status == TxStatus::Reverted {
            warn!(tx_hash = ?tx_hash, "transaction reverted");
            return Err(ClientError::Reverted { tx_hash });
        }

        self.notifier.notify(Notification::confirmed(
            format!(
                "Transaction confirmed after {:.1}s",
                started.elapsed().as_secs_f64()
            ),
            link,
        ));

        Ok(TransactionResult {
            tx_hash,
            status: TxStatus::Confirmed,
        })
    }

    /// Build the EIP-1559 transaction from a request and resolved gas plan
    fn build_tx(&self, request: &TxRequest, plan: &GasPlan) -> TypedTransaction {
        let tx = Eip1559TransactionRequest::new()
            .to(request.to)
            .data(request.data.clone())
            .nonce(request.nonce)
            .gas(plan.gas_limit)
            .max_fee_per_gas(plan.fees.max_fee_per_gas)
            .max_priority_fee_per_gas(plan.fees.max_priority_fee_per_gas)
            .chain_id(self.chain_id);
        TypedTransaction::Eip1559(tx)
    }

    /// Broadcast the signed payload, retrying transport failures up to the
    /// configured bound. A node-level rejection fails immediately carrying
    /// the node's message.
    async fn send_with_retry(&self, payload: Bytes) -> ClientResult<H256> {
        let mut attempts = 0;
        let max_attempts = self.config.max_retries;
        let mut last_error = None;

        while attempts < max_attempts {
            attempts += 1;

            match self.rpc.send_raw_transaction(payload.clone()).await {
                Ok(tx_hash) => {
                    info!(
                        "Transaction sent: {:?} (attempt {}/{})",
                        tx_hash, attempts, max_attempts
                    );
                    return Ok(tx_hash);
                }
                Err(e) if e.is_retryable() => {
                    warn!("Transaction send failed (attempt {}): {}", attempts, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            if attempts < max_attempts {
                tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| ClientError::RpcTransport("transaction send failed".to_string())))
    }

    /// Poll for the receipt until the node reports a terminal status, bounded
    /// by the optional confirmation timeout
    async fn await_receipt(&self, tx_hash: H256) -> ClientResult<TxStatus> {
        let deadline = self
            .config
            .confirm_timeout_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs));

        loop {
            if let Some(receipt) = self.rpc.transaction_receipt(tx_hash).await? {
                let status = if receipt.status == Some(0u64.into()) {
                    TxStatus::Reverted
                } else {
                    TxStatus::Confirmed
                };
                return Ok(status);
            }

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(ClientError::Timeout {
                        operation: "transaction confirmation".to_string(),
                    });
                }
            }

            tokio::time::sleep(Duration::from_millis(self.config.receipt_poll_interval_ms)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainRpc;
    use crate::notify::testing::RecordingSink;
    use crate::notify::NotifyKind;
    use crate::wallet::MockTransactionSigner;
    use ethers::types::{TransactionReceipt, U256};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn submitter_config() -> SubmitterConfig {
        SubmitterConfig {
            max_retries: 3,
            retry_delay_ms: 10,
            receipt_poll_interval_ms: 10,
            confirm_timeout_secs: Some(5),
            gas_limit_buffer_percent: 25,
            min_balance_eth: 0.01,
        }
    }

    fn chain_config() -> ChainConfig {
        ChainConfig {
            chain_id: 11155111,
            name: "sepolia".to_string(),
            rpc_urls: vec!["https://rpc.sepolia.org".to_string()],
            contract_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            explorer_url: "https://sepolia.etherscan.io".to_string(),
            priority_fee_gwei: 2,
            fallback_base_fee_gwei: 1,
            max_gas_price_gwei: 500,
        }
    }

    fn signer() -> MockTransactionSigner {
        let mut signer = MockTransactionSigner::new();
        signer
            .expect_address()
            .returning(|| Address::repeat_byte(0x11));
        signer
            .expect_sign_transaction()
            .returning(|_| Ok(Bytes::from(vec![0xf8, 0x01, 0x02])));
        signer
    }

    fn receipt(status: u64) -> TransactionReceipt {
        TransactionReceipt {
            status: Some(status.into()),
            ..Default::default()
        }
    }

    fn request(gas: Option<GasPlan>) -> TxRequest {
        TxRequest {
            to: Address::repeat_byte(0x22),
            data: Bytes::from(vec![0x01, 0x02, 0x03, 0x04]),
            nonce: 7,
            gas,
            op: GameOp::Play,
        }
    }

    fn plan() -> GasPlan {
        GasPlan {
            gas_limit: U256::from(100_000u64),
            fees: crate::tx::GasFees {
                max_fee_per_gas: U256::from(4_000_000_000u64),
                max_priority_fee_per_gas: U256::from(2_000_000_000u64),
            },
        }
    }

    fn build(rpc: MockChainRpc, sink: Arc<RecordingSink>) -> TransactionSubmitter {
        TransactionSubmitter::new(
            Arc::new(rpc),
            Arc::new(signer()),
            sink,
            &submitter_config(),
            &chain_config(),
        )
    }

    #[tokio::test]
    async fn successful_flow_notifies_submitted_then_confirmed() {
        let hash = H256::repeat_byte(0xab);
        let mut rpc = MockChainRpc::new();
        rpc.expect_send_raw_transaction()
            .times(1)
            .returning(move |_| Ok(hash));
        rpc.expect_transaction_receipt()
            .returning(|_| Ok(Some(receipt(1))));

        let sink = Arc::new(RecordingSink::default());
        let submitter = build(rpc, sink.clone());

        let result = submitter
            .submit_and_confirm(request(Some(plan())))
            .await
            .unwrap();

        assert_eq!(result.tx_hash, hash);
        assert_eq!(result.status, TxStatus::Confirmed);
        assert_eq!(
            sink.kinds(),
            vec![NotifyKind::Submitted, NotifyKind::Confirmed]
        );

        // Explorer link carries the hash
        let events = sink.events.lock().unwrap();
        let link = events[0].explorer_link.as_deref().unwrap();
        assert_eq!(link, format!("https://sepolia.etherscan.io/tx/{:?}", hash));
    }

    #[tokio::test]
    async fn node_rejection_fails_fast_without_receipt_polling() {
        let mut rpc = MockChainRpc::new();
        rpc.expect_send_raw_transaction()
            .times(1)
            .returning(|_| Err(ClientError::RpcLogic("nonce too low".into())));
        // No transaction_receipt expectation: polling after a rejection
        // would panic the mock.

        let sink = Arc::new(RecordingSink::default());
        let submitter = build(rpc, sink.clone());

        let err = submitter
            .submit_and_confirm(request(Some(plan())))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::RpcLogic(ref msg) if msg == "nonce too low"));
        assert_eq!(sink.kinds(), vec![NotifyKind::Failed]);
    }

    #[tokio::test]
    async fn transient_transport_failures_are_retried_within_the_bound() {
        let hash = H256::repeat_byte(0xcd);
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let mut rpc = MockChainRpc::new();
        rpc.expect_send_raw_transaction()
            .times(3)
            .returning(move |_| {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ClientError::RpcTransport("connection reset".into()))
                } else {
                    Ok(hash)
                }
            });
        rpc.expect_transaction_receipt()
            .returning(|_| Ok(Some(receipt(1))));

        let sink = Arc::new(RecordingSink::default());
        let submitter = build(rpc, sink.clone());

        let result = submitter
            .submit_and_confirm(request(Some(plan())))
            .await
            .unwrap();

        assert_eq!(result.tx_hash, hash);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_the_transport_error() {
        let mut rpc = MockChainRpc::new();
        rpc.expect_send_raw_transaction()
            .times(3)
            .returning(|_| Err(ClientError::RpcTransport("connection reset".into())));

        let sink = Arc::new(RecordingSink::default());
        let submitter = build(rpc, sink.clone());

        let err = submitter
            .submit_and_confirm(request(Some(plan())))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::RpcTransport(_)));
        assert_eq!(sink.kinds(), vec![NotifyKind::Failed]);
    }

    #[tokio::test]
    async fn reverted_receipt_surfaces_reverted_error() {
        let hash = H256::repeat_byte(0xee);
        let mut rpc = MockChainRpc::new();
        rpc.expect_send_raw_transaction()
            .returning(move |_| Ok(hash));
        rpc.expect_transaction_receipt()
            .returning(|_| Ok(Some(receipt(0))));

        let sink = Arc::new(RecordingSink::default());
        let submitter = build(rpc, sink.clone());

        let err = submitter
            .submit_and_confirm(request(Some(plan())))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Reverted { tx_hash } if tx_hash == hash));
        // Submitted fired before the failure
        assert_eq!(sink.kinds(), vec![NotifyKind::Submitted, NotifyKind::Failed]);
    }

    #[tokio::test]
    async fn pending_receipt_is_polled_until_terminal() {
        let hash = H256::repeat_byte(0x42);
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();

        let mut rpc = MockChainRpc::new();
        rpc.expect_send_raw_transaction()
            .returning(move |_| Ok(hash));
        rpc.expect_transaction_receipt().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok(None)
            } else {
                Ok(Some(receipt(1)))
            }
        });

        let sink = Arc::new(RecordingSink::default());
        let submitter = build(rpc, sink);

        let result = submitter
            .submit_and_confirm(request(Some(plan())))
            .await
            .unwrap();

        assert_eq!(result.status, TxStatus::Confirmed);
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn missing_gas_plan_is_resolved_from_network_state() {
        let hash = H256::repeat_byte(0x55);
        let mut rpc = MockChainRpc::new();
        rpc.expect_latest_base_fee()
            .returning(|| Ok(Some(U256::from(10_000_000_000u64))));
        rpc.expect_gas_price()
            .returning(|| Ok(U256::from(12_000_000_000u64)));
        rpc.expect_estimate_gas()
            .returning(|_| Ok(U256::from(80_000u64)));
        rpc.expect_send_raw_transaction()
            .returning(move |_| Ok(hash));
        rpc.expect_transaction_receipt()
            .returning(|_| Ok(Some(receipt(1))));

        let sink = Arc::new(RecordingSink::default());
        let submitter = build(rpc, sink);

        let result = submitter.submit_and_confirm(request(None)).await.unwrap();
        assert_eq!(result.status, TxStatus::Confirmed);
    }
}
