//! Sensor host wiring

use smokeline_core::{SmokelineConfig, SystemClock};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

use crate::error::SensorError;
use crate::relay::LocalRelay;
use crate::source::SensorSource;

/// Run SensorSource and LocalRelay until `shutdown` flips.
pub async fn run_sensor_host(
    config: &SmokelineConfig,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), SensorError> {
    let source = Arc::new(SensorSource::new(Arc::new(SystemClock)));
    let relay = LocalRelay::from_config(&config.relay);
    relay.attach(&source);

    let listener = LocalRelay::bind(&config.relay.bind).await?;
    let relay_task = {
        let relay = relay.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { relay.serve(listener, shutdown).await })
    };

    let stopper = {
        let source = source.clone();
        tokio::spawn(async move {
            let _ = shutdown.changed().await;
            source.shutdown();
        })
    };

    let result = source.start(&config.sensor).await;
    stopper.abort();
    if let Err(err) = &result {
        error!(error = %err, "Sensor source failed");
        relay_task.abort();
    }

    match relay_task.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(error = %err, "Local relay failed"),
        Err(err) if err.is_cancelled() => {}
        Err(err) => error!(error = %err, "Local relay task panicked"),
    }
    info!("Sensor host stopped");
    result
}
