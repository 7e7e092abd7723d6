//! Reading and payload builders

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use smokeline_core::{LocalMessage, Reading};

/// Timestamp `secs` seconds after a fixed origin.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
}

/// Reading with all four channels set.
pub fn reading(chamber: f64, probe1: f64, probe2: f64, probe3: f64, secs: i64) -> Reading {
    Reading::new(chamber, probe1, probe2, probe3, at(secs))
}

/// Raw sensor line as produced by the probe board.
pub fn payload(chamber: f64, meat: f64, meat2: f64, meat3: f64) -> String {
    json!({"Chamber": chamber, "Meat": meat, "Meat2": meat2, "Meat3": meat3}).to_string()
}

/// A sequence of `count` distinct, in-range sensor lines.
pub fn payloads(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let base = i as f64;
            payload(200.0 + base, 100.0 + base, 110.0 + base, 120.0 + base)
        })
        .collect()
}

/// Local channel frame wrapping `payload`.
pub fn local_frame(payload: &str) -> String {
    LocalMessage::temp(payload).encode().unwrap()
}
