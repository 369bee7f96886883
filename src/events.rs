use crate::config::ChainId;
use crate::state::ChainPromotions;

/// Everything the chain feeds report back to the main loop.
#[derive(Debug)]
pub enum Event {
    // A refresh cycle started for this chain
    ChainLoading { chain_id: ChainId },

    // Fresh promotions for one chain
    ChainRefreshed(ChainPromotions),

    // Refresh failed; the previous data stays valid
    ChainFailed { chain_id: ChainId, error: String },

    // Ctrl+C or kill signal
    Shutdown,
}
