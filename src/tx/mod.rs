//! Transaction submission module: gas resolution and the submit/confirm flow

mod gas;
mod submitter;

pub use gas::{GasEstimator, GasFees, GasPlan};
pub use submitter::{TransactionResult, TransactionSubmitter, TxRequest, TxStatus};
