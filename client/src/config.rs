use std::path::Path;
use std::time::Duration;

use ethers::types::Address;
use hashswap_core::interface::load_json;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ClientError, Result};
use crate::watcher::{WatcherConfig, DEFAULT_LOOKBACK_BLOCKS, DEFAULT_POLL_INTERVAL};

/// Client configuration, read from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// EVM JSON-RPC endpoint URL.
    pub rpc_url: Url,
    /// Address of the EVM HTLC contract.
    pub htlc_contract: Address,
    /// Server the wallet module talks to for the settlement leg.
    pub wallet_server_url: Url,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_lookback_blocks")]
    pub lookback_blocks: u64,
    #[serde(default)]
    pub earliest_block: u64,
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_lookback_blocks() -> u64 {
    DEFAULT_LOOKBACK_BLOCKS
}

impl ClientConfig {
    /// Loads and validates a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let config: Self = load_json(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (label, url) in [("rpc_url", &self.rpc_url), ("wallet_server_url", &self.wallet_server_url)] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ClientError::Config(format!(
                    "{label} must start with http:// or https://"
                )));
            }
        }
        if self.poll_interval_secs == 0 {
            return Err(ClientError::Config(
                "poll_interval_secs must be greater than zero".into(),
            ));
        }
        if self.lookback_blocks == 0 {
            return Err(ClientError::Config(
                "lookback_blocks must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            lookback_blocks: self.lookback_blocks,
            earliest_block: self.earliest_block,
            ..WatcherConfig::new(self.htlc_contract)
        }
    }
}
