use async_trait::async_trait;
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::SubgraphClient;
use crate::chain::TwabRewardsReader;
use crate::config::{ChainConfig, ChainId, Config};
use crate::error::{ChainReadError, FetchError, PromotionError};
use crate::state::{ChainPromotions, DerivedPromotion, EpochProgress, Promotion, PromotionRecord};

/// Where promotion metadata comes from (the subgraph in production).
#[async_trait]
pub trait PromotionSource: Send + Sync {
    async fn promotions(&self, ids: &[u64]) -> Result<Vec<PromotionRecord>, FetchError>;
}

/// Where the live epoch counter comes from (the rewards contract in production).
#[async_trait]
pub trait EpochSource: Send + Sync {
    async fn current_epoch_id(&self, promotion_id: u64) -> Result<EpochProgress, ChainReadError>;
}

#[async_trait]
impl PromotionSource for SubgraphClient {
    async fn promotions(&self, ids: &[u64]) -> Result<Vec<PromotionRecord>, FetchError> {
        self.filtered_promotions(ids).await
    }
}

#[async_trait]
impl EpochSource for TwabRewardsReader {
    async fn current_epoch_id(&self, promotion_id: u64) -> Result<EpochProgress, ChainReadError> {
        TwabRewardsReader::current_epoch_id(self, promotion_id).await
    }
}

/// Fetch the allow-listed promotions for one chain and merge in their epoch progress.
///
/// Epoch reads run one promotion at a time, in subgraph order. Any failure
/// fails the whole chain; there are no partial results.
pub async fn reconcile_chain(
    chain_id: ChainId,
    promotion_ids: &[u64],
    promotions: &dyn PromotionSource,
    epochs: &dyn EpochSource,
) -> Result<ChainPromotions, PromotionError> {
    let records = promotions.promotions(promotion_ids).await?;
    debug!(chain_id, count = records.len(), "Fetched promotion records");

    let mut derived = Vec::with_capacity(records.len());
    for record in records {
        let promotion = Promotion::try_from(record)?;
        let progress = epochs.current_epoch_id(promotion.id).await?;
        derived.push(DerivedPromotion::reconcile(promotion, progress));
    }

    Ok(ChainPromotions {
        chain_id,
        promotions: derived,
    })
}

/// Fetcher + reconciler for a single chain.
#[derive(Clone)]
pub struct ChainPipeline {
    pub chain_id: ChainId,
    pub promotion_ids: Vec<u64>,
    promotions: Arc<dyn PromotionSource>,
    epochs: Arc<dyn EpochSource>,
}

impl ChainPipeline {
    pub fn new(
        chain_id: ChainId,
        promotion_ids: Vec<u64>,
        promotions: Arc<dyn PromotionSource>,
        epochs: Arc<dyn EpochSource>,
    ) -> Self {
        Self {
            chain_id,
            promotion_ids,
            promotions,
            epochs,
        }
    }

    /// `None` when the chain is missing a data source or has nothing allow-listed.
    pub fn from_config(chain: &ChainConfig) -> Result<Option<Self>, ChainReadError> {
        let (Some(subgraph_url), Some(rpc_url), Some(address)) = (
            chain.subgraph_url.as_deref(),
            chain.rpc_url.as_deref(),
            chain.twab_rewards_address,
        ) else {
            return Ok(None);
        };
        if chain.promotion_ids.is_empty() {
            return Ok(None);
        }

        let reader = TwabRewardsReader::new(rpc_url, address)?;
        Ok(Some(Self::new(
            chain.chain_id,
            chain.promotion_ids.clone(),
            Arc::new(SubgraphClient::new(subgraph_url)),
            Arc::new(reader),
        )))
    }

    pub async fn refresh(&self) -> Result<ChainPromotions, PromotionError> {
        reconcile_chain(
            self.chain_id,
            &self.promotion_ids,
            self.promotions.as_ref(),
            self.epochs.as_ref(),
        )
        .await
    }
}

/// One pipeline per supported chain, ascending chain id.
/// A chain whose rpc url does not parse is skipped so the others still run.
pub fn build_pipelines(config: &Config) -> Vec<ChainPipeline> {
    let mut pipelines = Vec::new();
    for chain_id in config.supported_chain_ids() {
        let Some(chain) = config.chain(chain_id) else {
            continue;
        };
        match ChainPipeline::from_config(chain) {
            Ok(Some(pipeline)) => {
                info!(chain = %chain.label(), promotions = chain.promotion_ids.len(), "Chain enabled");
                pipelines.push(pipeline);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(chain = %chain.label(), error = %e, "Skipping chain");
            }
        }
    }
    pipelines
}

/// Run one refresh on every chain concurrently. A failing chain only
/// affects its own entry.
pub async fn refresh_all(
    pipelines: &[ChainPipeline],
) -> Vec<(ChainId, Result<ChainPromotions, PromotionError>)> {
    join_all(
        pipelines
            .iter()
            .map(|p| async move { (p.chain_id, p.refresh().await) }),
    )
    .await
}
