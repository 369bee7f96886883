use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::events::Event;
use crate::pipeline::ChainPipeline;

/// Polls one chain's promotions on a fixed interval.
pub struct ChainFeed {
    pipeline: ChainPipeline,
    interval: Duration,
}

impl ChainFeed {
    pub fn new(pipeline: ChainPipeline, interval: Duration) -> Self {
        Self { pipeline, interval }
    }

    /// Spawns a task that refreshes immediately, then every `interval`.
    /// The task exits once the receiver is dropped.
    pub fn spawn(self, tx: mpsc::Sender<Event>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(tx).await })
    }

    async fn run(self, tx: mpsc::Sender<Event>) {
        let chain_id = self.pipeline.chain_id;
        let mut ticker = tokio::time::interval(self.interval);
        // A slow refresh delays the next one instead of bunching them up
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if tx.send(Event::ChainLoading { chain_id }).await.is_err() {
                break;
            }

            let event = match self.pipeline.refresh().await {
                Ok(data) => {
                    info!(chain_id, promotions = data.promotions.len(), "Promotions refreshed");
                    Event::ChainRefreshed(data)
                }
                Err(e) => {
                    warn!(chain_id, error = %e, "Promotions refresh failed");
                    Event::ChainFailed {
                        chain_id,
                        error: e.to_string(),
                    }
                }
            };

            if tx.send(event).await.is_err() {
                break;
            }
        }

        debug!(chain_id, "Receiver dropped, chain feed stopped");
    }
}
