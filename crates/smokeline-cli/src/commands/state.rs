//! Cooking flag and history commands

use anyhow::Result;
use smokeline_bridge::{toggle_once, HttpIngestClient};
use smokeline_core::{DurableIngest, SmokelineConfig};

/// Toggle the cooking flag and print the new state.
pub async fn toggle(config: &SmokelineConfig) -> Result<()> {
    let state = toggle_once(config).await?;
    println!("smoking: {}", state.is_on());
    Ok(())
}

/// Print the current cooking session.
pub async fn show(config: &SmokelineConfig) -> Result<()> {
    let ingest = HttpIngestClient::new(&config.cloud)?;
    let session = ingest.session().await?;
    println!("{}", serde_json::to_string_pretty(&session)?);
    Ok(())
}

/// Print stored readings for `id`, or for the current session.
pub async fn history(config: &SmokelineConfig, id: Option<&str>) -> Result<()> {
    let ingest = HttpIngestClient::new(&config.cloud)?;
    let records = match id {
        Some(id) => ingest.history_by_id(id).await?,
        None => ingest.current_history().await?,
    };
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
