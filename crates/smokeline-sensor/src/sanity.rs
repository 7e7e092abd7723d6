//! Sanity logging for raw frames
//!
//! Classification is a side effect: it never blocks, drops or alters a frame.

use smokeline_core::{SanityClass, SensorFrame};
use tracing::{error, trace, warn};

use crate::error::SensorReadError;

/// Classify `frame` and log anomalies.
///
/// Too-cold and too-hot frames log a warning, NaN frames log an error, and a
/// payload that is not JSON is returned as a [`SensorReadError`] after logging.
pub fn inspect(frame: &SensorFrame) -> Result<SanityClass, SensorReadError> {
    let payload = frame.payload.as_str();
    let class = match frame.sanity() {
        Ok(class) => class,
        Err(err) => {
            error!(payload, error = %err, "Failed to parse sensor payload");
            return Err(SensorReadError::new(err.to_string(), Some(frame.payload.clone())));
        }
    };

    match class {
        SanityClass::Normal => trace!(payload, "temps ok"),
        SanityClass::TooCold => warn!(payload, "temps too cold: {payload}"),
        SanityClass::TooHot => warn!(payload, "temps too hot: {payload}"),
        SanityClass::NotANumber => error!(payload, "temps NAN: {payload}"),
    }
    Ok(class)
}
