//! Cached account state with optimistic reservation and rollback
//!
//! The session owns the nonce/balance cache for one account and funnels every
//! mutation through a single mutex-guarded path. A game operation reserves a
//! nonce and an estimated cost up front, then commits by doing nothing or
//! rolls back if submission fails. Callers must still serialize whole
//! transactions per account; the mutex protects the cache, not the ordering
//! of concurrent flows.

use crate::chain::ChainRpc;
use crate::error::{ClientError, ClientResult};

use ethers::types::{Address, U256};
use tokio::sync::Mutex;
use tracing::{debug, info};

struct CachedState {
    nonce: u64,
    balance: U256,
}

/// Per-login account session
pub struct AccountSession {
    address: Address,
    state: Mutex<CachedState>,
}

/// Record of an optimistic reservation, used for rollback on failure
#[derive(Debug, Clone, Copy)]
pub struct Reservation {
    pub nonce: u64,
    pub cost: U256,
}

impl AccountSession {
    /// Build a session from known state (e.g. restored from an earlier login)
    pub fn new(address: Address, nonce: u64, balance: U256) -> Self {
        Self {
            address,
            state: Mutex::new(CachedState { nonce, balance }),
        }
    }

    /// Connect a fresh session, reading nonce and balance from the node
    pub async fn connect(rpc: &dyn ChainRpc, address: Address) -> ClientResult<Self> {
        let nonce = rpc.transaction_count(address).await?;
        let balance = rpc.balance(address).await?;
        info!(
            "Account session connected: {:?} nonce={} balance={}",
            address, nonce, balance
        );
        Ok(Self::new(address, nonce, balance))
    }

    /// Re-read nonce and balance from the node
    pub async fn refresh(&self, rpc: &dyn ChainRpc) -> ClientResult<()> {
        let nonce = rpc.transaction_count(self.address).await?;
        let balance = rpc.balance(self.address).await?;
        let mut state = self.state.lock().await;
        state.nonce = nonce;
        state.balance = balance;
        debug!("Session refreshed: nonce={} balance={}", nonce, balance);
        Ok(())
    }

    /// Account address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Cached (nonce, balance) snapshot
    pub async fn snapshot(&self) -> (u64, U256) {
        let state = self.state.lock().await;
        (state.nonce, state.balance)
    }

    /// Fail fast if the cached balance is below the operation threshold.
    /// Uses only the cache; never touches the network.
    pub async fn ensure_funded(&self, min_balance: U256) -> ClientResult<()> {
        let state = self.state.lock().await;
        if state.balance < min_balance {
            return Err(ClientError::InsufficientBalance {
                have: state.balance,
                need: min_balance,
            });
        }
        Ok(())
    }

    /// Optimistically take the next nonce and deduct the estimated cost
    pub async fn reserve(&self, cost: U256) -> ClientResult<Reservation> {
        let mut state = self.state.lock().await;
        if state.balance < cost {
            return Err(ClientError::InsufficientBalance {
                have: state.balance,
                need: cost,
            });
        }

        let nonce = state.nonce;
        state.nonce += 1;
        state.balance -= cost;
        debug!("Reserved nonce {} (cost {})", nonce, cost);

        Ok(Reservation { nonce, cost })
    }

    /// Undo an optimistic reservation after a failed submission. Safe only
    /// while callers serialize transactions, which they must anyway.
    pub async fn rollback(&self, reservation: Reservation) {
        let mut state = self.state.lock().await;
        state.nonce = reservation.nonce;
        state.balance += reservation.cost;
        debug!("Rolled back nonce {}", reservation.nonce);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> AccountSession {
        AccountSession::new(Address::repeat_byte(0x11), 5, U256::exp10(18))
    }

    #[tokio::test]
    async fn reserve_advances_nonce_and_deducts_cost() {
        let session = session();
        let reservation = session.reserve(U256::from(1000u64)).await.unwrap();
        assert_eq!(reservation.nonce, 5);

        let (nonce, balance) = session.snapshot().await;
        assert_eq!(nonce, 6);
        assert_eq!(balance, U256::exp10(18) - 1000);
    }

    #[tokio::test]
    async fn rollback_restores_nonce_and_balance() {
        let session = session();
        let reservation = session.reserve(U256::from(1000u64)).await.unwrap();
        session.rollback(reservation).await;

        let (nonce, balance) = session.snapshot().await;
        assert_eq!(nonce, 5);
        assert_eq!(balance, U256::exp10(18));
    }

    #[tokio::test]
    async fn ensure_funded_checks_threshold() {
        let session = AccountSession::new(Address::repeat_byte(0x11), 0, U256::from(100u64));
        let err = session.ensure_funded(U256::from(200u64)).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::InsufficientBalance { have, need }
                if have == U256::from(100u64) && need == U256::from(200u64)
        ));
        assert!(session.ensure_funded(U256::from(50u64)).await.is_ok());
    }

    #[tokio::test]
    async fn reserve_refuses_cost_above_balance() {
        let session = AccountSession::new(Address::repeat_byte(0x11), 0, U256::from(100u64));
        let err = session.reserve(U256::from(500u64)).await.unwrap_err();
        assert!(matches!(err, ClientError::InsufficientBalance { .. }));

        // Nothing was consumed
        let (nonce, balance) = session.snapshot().await;
        assert_eq!(nonce, 0);
        assert_eq!(balance, U256::from(100u64));
    }
}
