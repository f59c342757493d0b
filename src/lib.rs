//! GameChain client - transaction submission for an on-chain board game
//!
//! Resolves EIP-1559 gas pricing and gas limits from network state, signs
//! through a wallet session, submits with bounded retries, and awaits
//! confirmation while emitting user-facing notifications. The strict
//! `max_fee_per_gas > max_priority_fee_per_gas` constraint is re-established
//! after every fee computation; the node rejects transactions that break it.
//!
//! Callers hold one [`game::GameClient`] per login and must serialize
//! transactions per account: the cached nonce is advanced optimistically
//! before confirmation and rolled back on failure.

pub mod chain;
pub mod config;
pub mod error;
pub mod game;
pub mod notify;
pub mod session;
pub mod tx;
pub mod wallet;

pub use chain::{ChainProvider, ChainRpc};
pub use config::Settings;
pub use error::{ClientError, ClientResult};
pub use game::{GameClient, GameOp};
pub use notify::{LogSink, Notification, NotificationSink, NotifyKind};
pub use session::AccountSession;
pub use tx::{GasFees, GasPlan, TransactionResult, TransactionSubmitter, TxRequest, TxStatus};
pub use wallet::{TransactionSigner, WalletSession};
