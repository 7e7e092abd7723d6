use anyhow::Result;
use smokeline_core::SmokelineConfig;
use smokeline_sensor::run_sensor_host;
use tracing::info;

use super::shutdown_on_signal;

/// Run the sensor host until interrupted.
pub async fn run(config: &SmokelineConfig) -> Result<()> {
    info!(
        mode = ?config.sensor.mode,
        bind = %config.relay.bind,
        "Starting sensor host"
    );
    run_sensor_host(config, shutdown_on_signal()).await?;
    Ok(())
}
