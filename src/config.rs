//! Configuration management for the GameChain client
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub submitter: SubmitterConfig,
    pub chain: ChainConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

/// Submission behavior knobs. Defaults match the documented constants:
/// 3 send attempts spaced 2000ms apart, 25% gas-limit buffer.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitterConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
    /// Optional bound on the confirmation wait. None means wait forever,
    /// matching the behavior callers have relied on so far.
    #[serde(default)]
    pub confirm_timeout_secs: Option<u64>,
    #[serde(default = "default_gas_limit_buffer_percent")]
    pub gas_limit_buffer_percent: u64,
    /// Minimum spendable balance before a game operation is attempted
    #[serde(default = "default_min_balance_eth")]
    pub min_balance_eth: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_urls: Vec<String>,
    pub contract_address: String,
    /// Block explorer base, e.g. "https://sepolia.etherscan.io"
    pub explorer_url: String,
    #[serde(default = "default_priority_fee_gwei")]
    pub priority_fee_gwei: u64,
    #[serde(default = "default_fallback_base_fee_gwei")]
    pub fallback_base_fee_gwei: u64,
    #[serde(default = "default_max_gas_price_gwei")]
    pub max_gas_price_gwei: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletConfig {
    /// Name of the environment variable holding the signing key
    pub private_key_env: Option<String>,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_receipt_poll_interval_ms() -> u64 {
    1500
}

fn default_gas_limit_buffer_percent() -> u64 {
    25
}

fn default_min_balance_eth() -> f64 {
    0.01
}

fn default_priority_fee_gwei() -> u64 {
    2
}

fn default_fallback_base_fee_gwei() -> u64 {
    1
}

fn default_max_gas_price_gwei() -> u64 {
    500
}

impl Settings {
    /// Load settings from the configured file
    pub fn load() -> Result<Self> {
        let config_path = env::var("GAMECHAIN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));
        Self::load_from(&config_path)
    }

    /// Load settings from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        // Substitute environment variables
        let config_str = substitute_env_vars(&config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.chain.rpc_urls.is_empty() {
            anyhow::bail!("Chain {} has no RPC URLs configured", self.chain.name);
        }
        if self
            .chain
            .contract_address
            .parse::<ethers::types::Address>()
            .is_err()
        {
            anyhow::bail!(
                "Invalid contract address for chain {}: {}",
                self.chain.name,
                self.chain.contract_address
            );
        }
        if self.chain.explorer_url.is_empty() {
            anyhow::bail!("Chain {} has no explorer URL configured", self.chain.name);
        }
        if self.submitter.max_retries == 0 {
            anyhow::bail!("max_retries must be at least 1");
        }
        Ok(())
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
