//! Wallet seam: signing capability obtained through an explicit connect step
//!
//! A [`WalletSession`] only exists once key material has been located and
//! parsed, so "wallet not ready" is a connect-time error rather than a null
//! check inside the submission flow.

use crate::config::Settings;
use crate::error::{ClientError, ClientResult};

use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes};
use tracing::info;

/// Signing capability required by the submitter
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Account the signatures will be attributed to
    fn address(&self) -> Address;

    /// Sign a fully-specified transaction, returning the raw signed payload
    async fn sign_transaction(&self, tx: TypedTransaction) -> ClientResult<Bytes>;
}

/// A connected signing session backed by a local key
pub struct WalletSession {
    wallet: LocalWallet,
}

impl WalletSession {
    /// Connect using the key source named in the configuration.
    ///
    /// Errors distinguish the two unusable states: no key source configured
    /// at all ([`ClientError::WalletUnavailable`]) versus a configured source
    /// with no account material in it ([`ClientError::AddressUnavailable`]).
    pub fn connect(settings: &Settings) -> ClientResult<Self> {
        let env_name = settings
            .wallet
            .private_key_env
            .as_deref()
            .ok_or(ClientError::WalletUnavailable)?;

        let raw_key = std::env::var(env_name)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or(ClientError::AddressUnavailable)?;

        let wallet = raw_key
            .parse::<LocalWallet>()
            .map_err(|e| ClientError::Signing(format!("Invalid private key: {}", e)))?
            .with_chain_id(settings.chain.chain_id);

        info!("Wallet session connected: {:?}", wallet.address());
        Ok(Self { wallet })
    }
}

#[async_trait]
impl TransactionSigner for WalletSession {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn sign_transaction(&self, tx: TypedTransaction) -> ClientResult<Bytes> {
        let signature = self
            .wallet
            .sign_transaction(&tx)
            .await
            .map_err(|e| ClientError::Signing(e.to_string()))?;
        Ok(tx.rlp_signed(&signature))
    }
}
