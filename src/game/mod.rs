//! Game operations: balance gating, optimistic accounting, and delegation to
//! the transaction submitter

pub mod abi;

use crate::chain::ChainRpc;
use crate::config::Settings;
use crate::error::{ClientError, ClientResult};
use crate::notify::{Notification, NotificationSink};
use crate::session::AccountSession;
use crate::tx::{TransactionResult, TransactionSubmitter, TxRequest};
use crate::wallet::TransactionSigner;

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, H256, U256};
use ethers::utils::parse_ether;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The on-chain operations the client submits, keyed for gas fallbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOp {
    StartGame,
    Play,
}

impl GameOp {
    /// Conservative gas limit used when estimation fails. Game
    /// initialization writes more state than a move.
    pub fn fallback_gas_limit(&self) -> U256 {
        match self {
            GameOp::StartGame => U256::from(150_000u64),
            GameOp::Play => U256::from(100_000u64),
        }
    }
}

impl fmt::Display for GameOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameOp::StartGame => "start_game",
            GameOp::Play => "play",
        };
        f.write_str(name)
    }
}

/// High-level client for the game contract. One instance per login session.
pub struct GameClient {
    submitter: TransactionSubmitter,
    session: Arc<AccountSession>,
    rpc: Arc<dyn ChainRpc>,
    notifier: Arc<dyn NotificationSink>,
    contract: Address,
    min_balance: U256,
}

impl GameClient {
    /// Connect a fresh client, reading account state from the node
    pub async fn connect(
        settings: &Settings,
        rpc: Arc<dyn ChainRpc>,
        signer: Arc<dyn TransactionSigner>,
        notifier: Arc<dyn NotificationSink>,
    ) -> ClientResult<Self> {
        let session = Arc::new(AccountSession::connect(rpc.as_ref(), signer.address()).await?);
        Self::resume(settings, rpc, signer, notifier, session)
    }

    /// Build a client around an existing account session (e.g. one restored
    /// from a previous login) without touching the network
    pub fn resume(
        settings: &Settings,
        rpc: Arc<dyn ChainRpc>,
        signer: Arc<dyn TransactionSigner>,
        notifier: Arc<dyn NotificationSink>,
        session: Arc<AccountSession>,
    ) -> ClientResult<Self> {
        let contract: Address = settings
            .chain
            .contract_address
            .parse()
            .map_err(|e| ClientError::Config(format!("Invalid contract address: {}", e)))?;

        let min_balance = parse_ether(settings.submitter.min_balance_eth.to_string())
            .map_err(|e| ClientError::Config(format!("Invalid minimum balance: {}", e)))?;

        let submitter = TransactionSubmitter::new(
            rpc.clone(),
            signer,
            notifier.clone(),
            &settings.submitter,
            &settings.chain,
        );

        Ok(Self {
            submitter,
            session,
            rpc,
            notifier,
            contract,
            min_balance,
        })
    }

    /// Account session backing this client
    pub fn session(&self) -> &AccountSession {
        &self.session
    }

    /// Submit a `startGame` transaction and wait for confirmation
    pub async fn start_game(
        &self,
        game_id: U256,
        boards: &[H256],
        moves: &[u8],
    ) -> ClientResult<TransactionResult> {
        let data = abi::encode_start_game(game_id, boards, moves);
        self.execute(GameOp::StartGame, data).await
    }

    /// Submit a `play` transaction and wait for confirmation
    pub async fn play(
        &self,
        game_id: U256,
        game_move: u8,
        result_board: H256,
    ) -> ClientResult<TransactionResult> {
        let data = abi::encode_play(game_id, game_move, result_board);
        self.execute(GameOp::Play, data).await
    }

    /// Read the current board and next move number via `eth_call`
    pub async fn board(&self, game_id: U256) -> ClientResult<(H256, u32)> {
        let data = abi::encode_get_board(game_id);
        let tx: TypedTransaction = Eip1559TransactionRequest::new()
            .to(self.contract)
            .data(data)
            .into();
        let raw = self.rpc.call(tx).await?;
        abi::decode_board(&raw)
    }

    /// Shared mutating-operation path: balance gate first (cache only, no
    /// network), then gas plan, optimistic reservation, submission, and
    /// rollback of the reservation on any failure. Failures surfaced before
    /// the submitter takes over still fire a failure notification; the
    /// submitter notifies for everything after that.
    async fn execute(&self, op: GameOp, data: Bytes) -> ClientResult<TransactionResult> {
        if let Err(e) = self.session.ensure_funded(self.min_balance).await {
            return Err(self.notify_failure(e));
        }

        let plan = self.submitter.plan_gas(self.contract, data.clone(), op).await;
        let reservation = match self.session.reserve(plan.max_cost()).await {
            Ok(reservation) => reservation,
            Err(e) => return Err(self.notify_failure(e)),
        };
        debug!(
            "Executing {} with nonce {} (max cost {})",
            op,
            reservation.nonce,
            plan.max_cost()
        );

        let request = TxRequest {
            to: self.contract,
            data,
            nonce: reservation.nonce,
            gas: Some(plan),
            op,
        };

        match self.submitter.submit_and_confirm(request).await {
            Ok(result) => Ok(result),
            Err(e) => {
                self.session.rollback(reservation).await;
                Err(e)
            }
        }
    }

    fn notify_failure(&self, e: ClientError) -> ClientError {
        self.notifier
            .notify(Notification::failed(format!("Transaction failed: {}", e)));
        e
    }
}
