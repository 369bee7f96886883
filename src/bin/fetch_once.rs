use anyhow::Result;
use serde_json::json;
use std::env;

use twab_promotions::config::Config;
use twab_promotions::pipeline::{build_pipelines, refresh_all};

/// Run a single refresh on every supported chain and print the results as JSON.
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let path = env::args()
        .nth(1)
        .or_else(|| env::var("CONFIG_PATH").ok())
        .unwrap_or_else(|| "config.toml".to_string());
    let cfg = Config::load(&path)?;
    twab_promotions::init_tracing(&cfg.general.log_level);

    let pipelines = build_pipelines(&cfg);
    let results = refresh_all(&pipelines).await;

    let output: Vec<serde_json::Value> = results
        .into_iter()
        .map(|(chain_id, result)| match result {
            Ok(data) => serde_json::to_value(data).unwrap_or_else(|e| {
                json!({ "chainId": chain_id, "error": e.to_string() })
            }),
            Err(e) => json!({ "chainId": chain_id, "error": e.to_string() }),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
