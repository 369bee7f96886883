use thiserror::Error;

/// Indexing-service (subgraph) query failures.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("subgraph request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("subgraph returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("subgraph query error: {0}")]
    GraphQl(String),

    #[error("subgraph response has no data")]
    MissingData,
}

/// On-chain read failures.
#[derive(Debug, Error)]
pub enum ChainReadError {
    #[error("invalid rpc url {url}: {reason}")]
    InvalidRpcUrl { url: String, reason: String },

    #[error("getCurrentEpochId({promotion_id}) failed: {reason}")]
    Rpc { promotion_id: u64, reason: String },

    #[error("getCurrentEpochId({promotion_id}) returned {value}, which overflows u64")]
    Overflow { promotion_id: u64, value: String },
}

/// Anything that can fail a single chain's refresh cycle.
#[derive(Debug, Error)]
pub enum PromotionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    ChainRead(#[from] ChainReadError),

    #[error("promotion field `{field}` has invalid value {value:?}")]
    InvalidField { field: &'static str, value: String },
}

impl PromotionError {
    pub fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            value: value.into(),
        }
    }
}
