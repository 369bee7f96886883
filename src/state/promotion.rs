use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::ChainId;
use crate::error::PromotionError;

/// Subgraph numbers come back as `BigInt` strings, but `Int` columns are plain
/// JSON numbers. Accept both and parse later.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Text(String),
    Int(u64),
}

impl From<&str> for RawNumber {
    fn from(s: &str) -> Self {
        RawNumber::Text(s.to_string())
    }
}

impl From<u64> for RawNumber {
    fn from(n: u64) -> Self {
        RawNumber::Int(n)
    }
}

impl RawNumber {
    fn to_text(&self) -> String {
        match self {
            RawNumber::Text(s) => s.clone(),
            RawNumber::Int(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketRef {
    pub id: String,
}

/// Promotion exactly as the subgraph returns it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionRecord {
    pub id: String,
    pub creator: String,
    #[serde(default)]
    pub created_at: Option<RawNumber>,
    #[serde(default)]
    pub ended_at: Option<RawNumber>,
    #[serde(default)]
    pub destroyed_at: Option<RawNumber>,
    pub start_timestamp: RawNumber,
    pub number_of_epochs: RawNumber,
    pub epoch_duration: RawNumber,
    pub tokens_per_epoch: RawNumber,
    #[serde(default)]
    pub rewards_unclaimed: Option<RawNumber>,
    pub token: String,
    #[serde(default)]
    pub ticket: Option<TicketRef>,
}

/// Promotion with every numeric field normalized to a fixed-width integer.
/// Token amounts stay arbitrary precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: u64,
    pub creator: Address,
    pub created_at: u64,
    pub ended_at: u64,
    pub destroyed_at: u64,
    pub start_timestamp: u64,
    /// `uint8` on the rewards contract.
    pub number_of_epochs: u8,
    pub epoch_duration: u64,
    pub tokens_per_epoch: U256,
    pub rewards_unclaimed: U256,
    pub token: Address,
    pub ticket_id: Option<String>,
}

/// Parse a hex (`0x..`) or decimal integer.
fn parse_int(field: &'static str, text: &str) -> Result<u64, PromotionError> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse::<u64>(),
    };
    parsed.map_err(|_| PromotionError::invalid(field, text))
}

/// Missing (null) values normalize to 0.
fn parse_opt_int(field: &'static str, value: Option<&RawNumber>) -> Result<u64, PromotionError> {
    match value {
        Some(v) => parse_int(field, &v.to_text()),
        None => Ok(0),
    }
}

fn parse_amount(field: &'static str, value: Option<&RawNumber>) -> Result<U256, PromotionError> {
    match value {
        Some(RawNumber::Int(n)) => Ok(U256::from(*n)),
        Some(RawNumber::Text(s)) => {
            U256::from_str(s.trim()).map_err(|_| PromotionError::invalid(field, s.as_str()))
        }
        None => Ok(U256::ZERO),
    }
}

fn parse_address(field: &'static str, text: &str) -> Result<Address, PromotionError> {
    Address::from_str(text.trim()).map_err(|_| PromotionError::invalid(field, text))
}

impl TryFrom<PromotionRecord> for Promotion {
    type Error = PromotionError;

    fn try_from(record: PromotionRecord) -> Result<Self, Self::Error> {
        let number_of_epochs = parse_int("numberOfEpochs", &record.number_of_epochs.to_text())?;
        let number_of_epochs = u8::try_from(number_of_epochs)
            .map_err(|_| PromotionError::invalid("numberOfEpochs", number_of_epochs.to_string()))?;

        Ok(Self {
            id: parse_int("id", &record.id)?,
            creator: parse_address("creator", &record.creator)?,
            created_at: parse_opt_int("createdAt", record.created_at.as_ref())?,
            ended_at: parse_opt_int("endedAt", record.ended_at.as_ref())?,
            destroyed_at: parse_opt_int("destroyedAt", record.destroyed_at.as_ref())?,
            start_timestamp: parse_int("startTimestamp", &record.start_timestamp.to_text())?,
            number_of_epochs,
            epoch_duration: parse_int("epochDuration", &record.epoch_duration.to_text())?,
            tokens_per_epoch: parse_amount("tokensPerEpoch", Some(&record.tokens_per_epoch))?,
            rewards_unclaimed: parse_amount("rewardsUnclaimed", record.rewards_unclaimed.as_ref())?,
            token: parse_address("token", &record.token)?,
            ticket_id: record.ticket.map(|t| t.id),
        })
    }
}

/// Live epoch counter read from the rewards contract.
/// Keeps counting past `number_of_epochs` once a promotion has run its course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochProgress {
    pub current_epoch_id: u64,
}

/// One epoch window, unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Epoch {
    pub epoch_start_timestamp: u64,
    pub epoch_end_timestamp: u64,
}

impl Epoch {
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        to_datetime(self.epoch_start_timestamp)
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        to_datetime(self.epoch_end_timestamp)
    }
}

fn to_datetime(ts: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(i64::try_from(ts).ok()?, 0)
}

/// Every epoch of a promotion plus the ones that have not completed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpochCollection {
    pub epochs: Vec<Epoch>,
    #[serde(rename = "remainingEpochsArray")]
    pub remaining_epochs: Vec<Epoch>,
}

/// `None` until the contract reports at least one epoch, so "nothing observed
/// yet" never reads as "zero epochs completed". Clamped at `number_of_epochs`.
pub fn max_completed_epoch_id(current_epoch_id: u64, number_of_epochs: u8) -> Option<u8> {
    if current_epoch_id == 0 {
        return None;
    }
    // min() fits in u8 because number_of_epochs does
    Some(current_epoch_id.min(u64::from(number_of_epochs)) as u8)
}

/// Build the epoch windows for a promotion.
///
/// Returns `None` when nothing remains. A missing `remaining_epochs` (no
/// epoch observed yet) counts as all epochs remaining.
pub fn epoch_collection(
    start_timestamp: u64,
    epoch_duration: u64,
    number_of_epochs: u8,
    max_completed_epoch_id: Option<u8>,
    remaining_epochs: Option<u8>,
) -> Option<EpochCollection> {
    if remaining_epochs.unwrap_or(number_of_epochs) == 0 {
        return None;
    }

    let epochs: Vec<Epoch> = (0..u64::from(number_of_epochs))
        .map(|epoch_num| {
            let epoch_start_timestamp =
                start_timestamp.saturating_add(epoch_num.saturating_mul(epoch_duration));
            Epoch {
                epoch_start_timestamp,
                epoch_end_timestamp: epoch_start_timestamp.saturating_add(epoch_duration),
            }
        })
        .collect();

    let first_remaining = max_completed_epoch_id.unwrap_or(0) as usize;
    let remaining_epochs = epochs[first_remaining.min(epochs.len())..].to_vec();

    Some(EpochCollection {
        epochs,
        remaining_epochs,
    })
}

/// Promotion view model: subgraph metadata merged with the live epoch counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedPromotion {
    #[serde(flatten)]
    pub promotion: Promotion,
    #[serde(flatten)]
    pub progress: EpochProgress,
    pub is_complete: bool,
    pub max_completed_epoch_id: Option<u8>,
    /// `None` when `max_completed_epoch_id` is `None`.
    pub remaining_epochs: Option<u8>,
    pub end_timestamp: u64,
    pub epoch_collection: Option<EpochCollection>,
}

impl DerivedPromotion {
    pub fn reconcile(promotion: Promotion, progress: EpochProgress) -> Self {
        let number_of_epochs = promotion.number_of_epochs;

        // Raw comparison, the counter overshoots once the promotion is over
        let is_complete = progress.current_epoch_id >= u64::from(number_of_epochs);

        let max_completed_epoch_id =
            max_completed_epoch_id(progress.current_epoch_id, number_of_epochs);

        // From the clamped value so an overshooting counter can't go negative
        let remaining_epochs = max_completed_epoch_id.map(|max| number_of_epochs - max);

        let end_timestamp = promotion
            .start_timestamp
            .saturating_add(u64::from(number_of_epochs).saturating_mul(promotion.epoch_duration));

        let epoch_collection = epoch_collection(
            promotion.start_timestamp,
            promotion.epoch_duration,
            number_of_epochs,
            max_completed_epoch_id,
            remaining_epochs,
        );

        Self {
            promotion,
            progress,
            is_complete,
            max_completed_epoch_id,
            remaining_epochs,
            end_timestamp,
            epoch_collection,
        }
    }

    pub fn id(&self) -> u64 {
        self.promotion.id
    }

    /// First epoch that has not completed yet.
    pub fn next_epoch(&self) -> Option<&Epoch> {
        self.epoch_collection
            .as_ref()
            .and_then(|c| c.remaining_epochs.first())
    }

    /// Running right now (unix seconds) and not yet complete on chain.
    pub fn is_active(&self, now: u64) -> bool {
        !self.is_complete && self.promotion.start_timestamp <= now && now < self.end_timestamp
    }
}

/// One chain's reconciled promotions, as handed to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainPromotions {
    pub chain_id: ChainId,
    pub promotions: Vec<DerivedPromotion>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, number_of_epochs: u64, epoch_duration: u64, start: u64) -> PromotionRecord {
        PromotionRecord {
            id: id.to_string(),
            creator: "0x00000000000000000000000000000000000000aa".to_string(),
            created_at: Some(RawNumber::from("900")),
            ended_at: None,
            destroyed_at: Some(RawNumber::from("0")),
            start_timestamp: RawNumber::from(start.to_string().as_str()),
            number_of_epochs: RawNumber::from(number_of_epochs),
            epoch_duration: RawNumber::from(epoch_duration.to_string().as_str()),
            tokens_per_epoch: RawNumber::from("1000000000000000000000000000000"),
            rewards_unclaimed: None,
            token: "0x00000000000000000000000000000000000000bb".to_string(),
            ticket: Some(TicketRef {
                id: "0x00000000000000000000000000000000000000cc".to_string(),
            }),
        }
    }

    fn promotion(number_of_epochs: u8, epoch_duration: u64, start: u64) -> Promotion {
        Promotion::try_from(record("0x1", number_of_epochs as u64, epoch_duration, start)).unwrap()
    }

    fn derive(number_of_epochs: u8, current_epoch_id: u64) -> DerivedPromotion {
        DerivedPromotion::reconcile(
            promotion(number_of_epochs, 3600, 1000),
            EpochProgress { current_epoch_id },
        )
    }

    #[test]
    fn test_normalize_record() {
        let p = Promotion::try_from(record("0x1f", 10, 3600, 1000)).unwrap();

        assert_eq!(p.id, 31);
        assert_eq!(p.number_of_epochs, 10);
        assert_eq!(p.epoch_duration, 3600);
        assert_eq!(p.start_timestamp, 1000);
        assert_eq!(p.created_at, 900);
        assert_eq!(p.ended_at, 0);
        assert_eq!(p.destroyed_at, 0);
        assert_eq!(p.rewards_unclaimed, U256::ZERO);
        assert_eq!(
            p.tokens_per_epoch,
            U256::from_str("1000000000000000000000000000000").unwrap()
        );
        assert_eq!(
            p.ticket_id.as_deref(),
            Some("0x00000000000000000000000000000000000000cc")
        );
    }

    #[test]
    fn test_normalize_rejects_bad_numbers() {
        let mut r = record("0x1", 10, 3600, 1000);
        r.epoch_duration = RawNumber::from("soon");
        match Promotion::try_from(r) {
            Err(PromotionError::InvalidField { field, value }) => {
                assert_eq!(field, "epochDuration");
                assert_eq!(value, "soon");
            }
            other => panic!("expected InvalidField, got {:?}", other),
        }

        // The contract stores the epoch count as uint8
        let r = record("0x1", 255, 3600, 1000);
        assert_eq!(Promotion::try_from(r).unwrap().number_of_epochs, 255);
        for oversized in [256, 5_000_000, u64::from(u32::MAX)] {
            let r = record("0x1", oversized, 3600, 1000);
            match Promotion::try_from(r) {
                Err(PromotionError::InvalidField { field, value }) => {
                    assert_eq!(field, "numberOfEpochs");
                    assert_eq!(value, oversized.to_string());
                }
                other => panic!("expected InvalidField, got {:?}", other),
            }
        }

        let mut r = record("0x1", 10, 3600, 1000);
        r.token = "not-an-address".to_string();
        assert!(Promotion::try_from(r).is_err());
    }

    #[test]
    fn test_decode_subgraph_json() {
        let json = r#"{
            "id": "0x2",
            "creator": "0x00000000000000000000000000000000000000aa",
            "createdAt": "1650000000",
            "endedAt": null,
            "destroyedAt": null,
            "startTimestamp": "1650003600",
            "numberOfEpochs": 12,
            "epochDuration": "604800",
            "tokensPerEpoch": "500000000",
            "rewardsUnclaimed": "0",
            "token": "0x00000000000000000000000000000000000000bb",
            "ticket": { "id": "0x00000000000000000000000000000000000000cc" }
        }"#;
        let r: PromotionRecord = serde_json::from_str(json).unwrap();
        let p = Promotion::try_from(r).unwrap();

        assert_eq!(p.id, 2);
        assert_eq!(p.number_of_epochs, 12);
        assert_eq!(p.epoch_duration, 604_800);
        assert_eq!(p.ended_at, 0);
        assert_eq!(p.tokens_per_epoch, U256::from(500_000_000u64));
    }

    #[test]
    fn test_example_in_progress() {
        let d = derive(10, 4);

        assert!(!d.is_complete);
        assert_eq!(d.max_completed_epoch_id, Some(4));
        assert_eq!(d.remaining_epochs, Some(6));
        assert_eq!(d.end_timestamp, 37_000);

        let collection = d.epoch_collection.as_ref().unwrap();
        assert_eq!(collection.epochs.len(), 10);
        assert_eq!(collection.remaining_epochs.len(), 6);
        assert_eq!(collection.remaining_epochs[0].epoch_start_timestamp, 15_400);
        assert_eq!(collection.remaining_epochs[0].epoch_end_timestamp, 19_000);
        assert_eq!(d.next_epoch().unwrap().epoch_start_timestamp, 15_400);
    }

    #[test]
    fn test_example_overshoot() {
        let d = derive(5, 7);

        assert!(d.is_complete);
        assert_eq!(d.max_completed_epoch_id, Some(5));
        assert_eq!(d.remaining_epochs, Some(0));
        assert!(d.epoch_collection.is_none());
        assert!(d.next_epoch().is_none());
    }

    #[test]
    fn test_exactly_complete() {
        let d = derive(5, 5);

        assert!(d.is_complete);
        assert_eq!(d.max_completed_epoch_id, Some(5));
        assert_eq!(d.remaining_epochs, Some(0));
        assert!(d.epoch_collection.is_none());
    }

    #[test]
    fn test_no_epoch_observed() {
        let d = derive(8, 0);

        assert!(!d.is_complete);
        assert_eq!(d.max_completed_epoch_id, None);
        assert_eq!(d.remaining_epochs, None);

        // Nothing completed, so everything remains
        let collection = d.epoch_collection.as_ref().unwrap();
        assert_eq!(collection.epochs.len(), 8);
        assert_eq!(collection.remaining_epochs, collection.epochs);
    }

    #[test]
    fn test_zero_epoch_promotion() {
        let d = derive(0, 0);

        assert!(d.is_complete);
        assert_eq!(d.max_completed_epoch_id, None);
        assert!(d.epoch_collection.is_none());
        assert_eq!(d.end_timestamp, 1000);
    }

    #[test]
    fn test_partial_progress_properties() {
        let n = 12;
        for current in 1..n {
            let d = derive(n, current as u64);
            let remaining = d.remaining_epochs.unwrap();

            assert!(!d.is_complete);
            assert_eq!(remaining, n - current);

            let collection = d.epoch_collection.as_ref().unwrap();
            assert_eq!(collection.epochs.len(), n as usize);
            assert_eq!(collection.remaining_epochs.len(), remaining as usize);
            assert_eq!(
                collection.remaining_epochs.last(),
                collection.epochs.last()
            );
        }
    }

    #[test]
    fn test_epochs_are_contiguous() {
        let collection = epoch_collection(1_000, 60, 4, Some(1), Some(3)).unwrap();

        let starts: Vec<u64> = collection.epochs.iter().map(|e| e.epoch_start_timestamp).collect();
        assert_eq!(starts, vec![1_000, 1_060, 1_120, 1_180]);
        for pair in collection.epochs.windows(2) {
            assert_eq!(pair[0].epoch_end_timestamp, pair[1].epoch_start_timestamp);
        }
        assert_eq!(collection.remaining_epochs.len(), 3);
    }

    #[test]
    fn test_end_timestamp_saturates() {
        let d = DerivedPromotion::reconcile(
            promotion(3, u64::MAX / 2, 10),
            EpochProgress { current_epoch_id: 1 },
        );
        assert_eq!(d.end_timestamp, u64::MAX);
    }

    #[test]
    fn test_is_active() {
        let d = derive(10, 4);
        assert!(!d.is_active(999));
        assert!(d.is_active(1_000));
        assert!(d.is_active(36_999));
        assert!(!d.is_active(37_000));

        assert!(!derive(5, 7).is_active(2_000));
    }

    #[test]
    fn test_epoch_datetime() {
        let epoch = Epoch {
            epoch_start_timestamp: 1_650_000_000,
            epoch_end_timestamp: 1_650_003_600,
        };
        assert_eq!(epoch.start_time().unwrap().timestamp(), 1_650_000_000);
        assert_eq!(epoch.end_time().unwrap().timestamp(), 1_650_003_600);
    }

    #[test]
    fn test_serialized_shape() {
        let d = derive(10, 4);
        let value = serde_json::to_value(&d).unwrap();

        assert_eq!(value["id"], 1);
        assert_eq!(value["currentEpochId"], 4);
        assert_eq!(value["isComplete"], false);
        assert_eq!(value["maxCompletedEpochId"], 4);
        assert_eq!(value["remainingEpochs"], 6);
        assert_eq!(value["endTimestamp"], 37_000);
        assert_eq!(
            value["epochCollection"]["remainingEpochsArray"][0]["epochStartTimestamp"],
            15_400
        );

        let done = serde_json::to_value(derive(5, 7)).unwrap();
        assert!(done["epochCollection"].is_null());
    }
}
