use anyhow::Result;
use smokeline_bridge::run_bridge;
use smokeline_core::SmokelineConfig;
use tracing::info;

use super::shutdown_on_signal;

/// Run the display bridge until interrupted.
pub async fn run(config: &SmokelineConfig) -> Result<()> {
    info!(
        relay = %config.bridge.relay_url,
        cloud = %config.cloud.channel_url,
        "Starting display bridge"
    );
    run_bridge(config, shutdown_on_signal()).await?;
    Ok(())
}
