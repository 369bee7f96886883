use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::FetchError;
use crate::state::PromotionRecord;

const PROMOTIONS_QUERY: &str = r#"
query promotionsQuery($ids: [String!]!) {
  promotions(where: { id_in: $ids }) {
    id
    creator
    createdAt
    endedAt
    destroyedAt
    startTimestamp
    numberOfEpochs
    epochDuration
    tokensPerEpoch
    rewardsUnclaimed
    token
    ticket {
      id
    }
  }
}
"#;

#[derive(Serialize)]
struct GraphQlRequest<'a, V> {
    query: &'a str,
    variables: V,
}

#[derive(Serialize)]
struct PromotionsVariables {
    ids: Vec<String>,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct PromotionsData {
    promotions: Vec<PromotionRecord>,
}

/// Subgraph entity ids are lowercase hex without padding.
pub fn promotion_id_hex(id: u64) -> String {
    format!("0x{:x}", id)
}

/// Client for one chain's TWAB rewards subgraph.
#[derive(Debug, Clone)]
pub struct SubgraphClient {
    url: String,
    http: reqwest::Client,
}

impl SubgraphClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Fetch the promotions whose ids are in `ids`. Failures are logged and returned.
    pub async fn filtered_promotions(&self, ids: &[u64]) -> Result<Vec<PromotionRecord>, FetchError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = self.query_promotions(ids).await;
        if let Err(e) = &result {
            error!(url = %self.url, error = %e, "Promotions query failed");
        }
        result
    }

    async fn query_promotions(&self, ids: &[u64]) -> Result<Vec<PromotionRecord>, FetchError> {
        let request = GraphQlRequest {
            query: PROMOTIONS_QUERY,
            variables: PromotionsVariables {
                ids: ids.iter().copied().map(promotion_id_hex).collect(),
            },
        };

        debug!(url = %self.url, count = ids.len(), "Querying promotions");
        let response = self.http.post(&self.url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: GraphQlResponse<PromotionsData> = response.json().await?;
        decode_promotions(body)
    }
}

fn decode_promotions(
    body: GraphQlResponse<PromotionsData>,
) -> Result<Vec<PromotionRecord>, FetchError> {
    if !body.errors.is_empty() {
        let messages: Vec<String> = body.errors.into_iter().map(|e| e.message).collect();
        return Err(FetchError::GraphQl(messages.join("; ")));
    }

    body.data
        .map(|d| d.promotions)
        .ok_or(FetchError::MissingData)
}
