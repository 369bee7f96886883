use alloy_primitives::Address;
use serde::Deserialize;
use std::env;
use std::fs;
use std::time::Duration;

pub type ChainId = u64;

/// Subgraph refresh cadence when the config does not set one.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: General,
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
}

#[derive(Debug, Deserialize)]
pub struct General {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

impl Default for General {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

/// Everything needed to run one chain's promotion pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: ChainId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub subgraph_url: Option<String>,
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default)]
    pub twab_rewards_address: Option<Address>,
    /// Allow-listed promotion ids. Anything else the subgraph knows about is ignored.
    #[serde(default)]
    pub promotion_ids: Vec<u64>,
}

impl ChainConfig {
    /// Human readable label for logs.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({})", name, self.chain_id),
            None => self.chain_id.to_string(),
        }
    }

    /// A chain is only polled when both data sources are reachable and
    /// there is at least one promotion to show.
    pub fn is_supported(&self) -> bool {
        self.subgraph_url.is_some()
            && self.rpc_url.is_some()
            && self.twab_rewards_address.is_some()
            && !self.promotion_ids.is_empty()
    }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_rpc_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(contents)?;
        if config.general.refresh_interval_secs == 0 {
            anyhow::bail!("general.refresh_interval_secs must be greater than zero");
        }
        Ok(config)
    }

    /// `RPC_URL_<chain_id>` replaces the configured rpc url so API keys can
    /// live in `.env` instead of the config file.
    pub fn apply_rpc_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for chain in &mut self.chains {
            if let Some(url) = lookup(&format!("RPC_URL_{}", chain.chain_id)) {
                chain.rpc_url = Some(url);
            }
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.general.refresh_interval_secs)
    }

    pub fn chain(&self, chain_id: ChainId) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }

    /// Chain ids with a complete pipeline configuration, ascending.
    pub fn supported_chain_ids(&self) -> Vec<ChainId> {
        let mut ids: Vec<ChainId> = self
            .chains
            .iter()
            .filter(|c| c.is_supported())
            .map(|c| c.chain_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}
