use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::ChainId;
use super::ChainPromotions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryStatus {
    Loading,
    Success,
    Error,
}

/// Polling result for one chain.
/// `data` survives a failed refresh so the UI keeps showing the last good value.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryState {
    pub status: QueryStatus,
    pub data: Option<ChainPromotions>,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Refresh attempt in flight (initial load or background refetch).
    pub is_fetching: bool,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            status: QueryStatus::Loading,
            data: None,
            error: None,
            updated_at: None,
            is_fetching: false,
        }
    }
}

impl QueryState {
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}

/// Per-chain query cache. Owned by the single event consumer; every update
/// touches exactly one chain's entry.
#[derive(Debug, Default)]
pub struct ChainStates {
    states: BTreeMap<ChainId, QueryState>,
}

impl ChainStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register chains up front so they report `Loading` before the first result.
    pub fn with_chains(chain_ids: &[ChainId]) -> Self {
        let mut states = Self::new();
        for &chain_id in chain_ids {
            states.states.entry(chain_id).or_default();
        }
        states
    }

    pub fn mark_fetching(&mut self, chain_id: ChainId) {
        self.states.entry(chain_id).or_default().is_fetching = true;
    }

    pub fn apply_success(&mut self, data: ChainPromotions, now: DateTime<Utc>) {
        let state = self.states.entry(data.chain_id).or_default();
        state.status = QueryStatus::Success;
        state.data = Some(data);
        state.error = None;
        state.updated_at = Some(now);
        state.is_fetching = false;
    }

    /// Record a failed refresh. Previous data is left untouched.
    pub fn apply_error(&mut self, chain_id: ChainId, error: String) {
        let state = self.states.entry(chain_id).or_default();
        state.status = QueryStatus::Error;
        state.error = Some(error);
        state.is_fetching = false;
    }

    pub fn get(&self, chain_id: ChainId) -> Option<&QueryState> {
        self.states.get(&chain_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChainId, &QueryState)> {
        self.states.iter()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Promotions from every chain that currently has data, stale or not.
    pub fn all_promotions(&self) -> Vec<&ChainPromotions> {
        self.states.values().filter_map(|s| s.data.as_ref()).collect()
    }
}
