use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use alloy::transports::http::reqwest::Url;
use alloy_primitives::{Address, U256};
use tracing::debug;

use crate::error::ChainReadError;
use crate::state::EpochProgress;

sol! {
    #[sol(rpc)]
    contract TwabRewards {
        /// Epoch counter for a promotion. Not clamped at the promotion's epoch count.
        function getCurrentEpochId(uint256 _promotionId) external view returns (uint256);
    }
}

/// Read-only handle on one chain's TwabRewards deployment.
/// Built once per chain and reused for every refresh.
#[derive(Clone)]
pub struct TwabRewardsReader {
    address: Address,
    provider: DynProvider,
}

impl TwabRewardsReader {
    pub fn new(rpc_url: &str, address: Address) -> Result<Self, ChainReadError> {
        let url = Url::parse(rpc_url).map_err(|e| ChainReadError::InvalidRpcUrl {
            url: redact(rpc_url),
            reason: e.to_string(),
        })?;

        let provider = ProviderBuilder::new().connect_http(url).erased();
        Ok(Self { address, provider })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn current_epoch_id(&self, promotion_id: u64) -> Result<EpochProgress, ChainReadError> {
        let contract = TwabRewards::new(self.address, &self.provider);

        let value = contract
            .getCurrentEpochId(U256::from(promotion_id))
            .call()
            .await
            .map_err(|e| ChainReadError::Rpc {
                promotion_id,
                reason: e.to_string(),
            })?;

        let current_epoch_id = to_epoch_id(promotion_id, value)?;
        debug!(promotion_id, current_epoch_id, contract = %self.address, "Read epoch progress");
        Ok(EpochProgress { current_epoch_id })
    }
}

fn to_epoch_id(promotion_id: u64, value: U256) -> Result<u64, ChainReadError> {
    u64::try_from(value).map_err(|_| ChainReadError::Overflow {
        promotion_id,
        value: value.to_string(),
    })
}

/// Rpc urls often embed an API key in the path; keep only scheme and host for logs.
fn redact(rpc_url: &str) -> String {
    match rpc_url.split_once("://") {
        Some((scheme, rest)) => {
            let host = rest.split('/').next().unwrap_or_default();
            format!("{}://{}", scheme, host)
        }
        None => "<unparseable>".to_string(),
    }
}
