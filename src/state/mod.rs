mod chains;
mod promotion;

pub use chains::{ChainStates, QueryState, QueryStatus};
pub use promotion::{
    epoch_collection, max_completed_epoch_id, ChainPromotions, DerivedPromotion, Epoch,
    EpochCollection, EpochProgress, Promotion, PromotionRecord, RawNumber, TicketRef,
};
