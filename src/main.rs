use std::env;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use twab_promotions::config::{ChainId, Config};
use twab_promotions::events::Event;
use twab_promotions::feeds::ChainFeed;
use twab_promotions::pipeline::build_pipelines;
use twab_promotions::state::{ChainStates, QueryState};

fn log_chain(chain_id: ChainId, state: &QueryState) {
    let Some(data) = &state.data else {
        info!(chain_id, status = ?state.status, "No promotions yet");
        return;
    };

    for promotion in &data.promotions {
        info!(
            chain_id,
            promotion_id = promotion.id(),
            current_epoch = promotion.progress.current_epoch_id,
            epochs = promotion.promotion.number_of_epochs,
            remaining = ?promotion.remaining_epochs,
            complete = promotion.is_complete,
            stale = state.is_error(),
            "Promotion"
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let cfg = Config::load(&path)?;
    twab_promotions::init_tracing(&cfg.general.log_level);
    info!(path = %path, "Loaded config");

    let pipelines = build_pipelines(&cfg);
    if pipelines.is_empty() {
        warn!("No supported chains configured, nothing to do");
        return Ok(());
    }

    let chain_ids: Vec<ChainId> = pipelines.iter().map(|p| p.chain_id).collect();
    let mut states = ChainStates::with_chains(&chain_ids);

    // Create the event channel
    let (tx, mut rx) = mpsc::channel::<Event>(100);

    // One feed per chain
    for pipeline in pipelines {
        ChainFeed::new(pipeline, cfg.refresh_interval()).spawn(tx.clone());
    }

    let shutdown_tx = tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(Event::Shutdown).await;
        }
    });
    drop(tx);

    info!(chains = ?chain_ids, "Starting event loop (Ctrl+C to quit)");
    while let Some(event) = rx.recv().await {
        match event {
            Event::ChainLoading { chain_id } => {
                states.mark_fetching(chain_id);
            }
            Event::ChainRefreshed(data) => {
                let chain_id = data.chain_id;
                states.apply_success(data, chrono::Utc::now());
                if let Some(state) = states.get(chain_id) {
                    log_chain(chain_id, state);
                }
            }
            Event::ChainFailed { chain_id, error } => {
                error!(chain_id, error = %error, "Chain refresh failed, keeping previous data");
                states.apply_error(chain_id, error);
            }
            Event::Shutdown => {
                info!("Shutting down...");
                break;
            }
        }
    }

    for (chain_id, state) in states.iter() {
        info!(
            chain_id = *chain_id,
            status = ?state.status,
            updated_at = ?state.updated_at,
            "Final chain state"
        );
    }

    Ok(())
}
