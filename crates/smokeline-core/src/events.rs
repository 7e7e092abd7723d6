//! Cloud channel events
//!
//! Every frame on the cloud channel is a JSON envelope
//! `{"event": <name>, "data": <payload>}`. The four events the pipeline speaks:
//!
//! | Event         | Payload                                            |
//! |---------------|----------------------------------------------------|
//! | `events`      | live composite state ([`LiveState`])               |
//! | `smokeUpdate` | [`SmokeUpdate`] (or a bare boolean from old peers) |
//! | `clear`       | ignored; presence is the signal                    |
//! | `refresh`     | ignored; presence is the signal                    |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Result, SmokelineError};
use crate::reading::Reading;
use crate::session::SmokeUpdate;

/// Composite live state streamed on the `events` channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveState {
    /// The reading being streamed
    #[serde(flatten)]
    pub reading: Reading,
    /// Cooking flag as the sender currently sees it
    #[serde(default)]
    pub smoking: bool,
}

/// One event on the cloud channel.
#[derive(Debug, Clone, PartialEq)]
pub enum CloudEvent {
    /// A live reading (`events`)
    Live(LiveState),
    /// The cooking flag changed (`smokeUpdate`)
    SmokeUpdate(SmokeUpdate),
    /// Cached history must be dropped (`clear`)
    Clear,
    /// Cached history must be re-fetched (`refresh`)
    Refresh,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

impl CloudEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Live(_) => "events",
            Self::SmokeUpdate(_) => "smokeUpdate",
            Self::Clear => "clear",
            Self::Refresh => "refresh",
        }
    }

    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String> {
        let data = match self {
            Self::Live(state) => serde_json::to_value(state)?,
            Self::SmokeUpdate(update) => serde_json::to_value(update)?,
            Self::Clear => Value::Bool(true),
            Self::Refresh => Value::Null,
        };
        let envelope = Envelope {
            event: self.name().to_string(),
            data,
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    /// Decode a JSON text frame.
    pub fn decode(text: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(text)?;
        match envelope.event.as_str() {
            "events" => {
                // Some senders double-encode the composite state as a string.
                let data = match envelope.data {
                    Value::String(inner) => serde_json::from_str(&inner)?,
                    other => other,
                };
                Ok(Self::Live(serde_json::from_value(data)?))
            }
            "smokeUpdate" => match envelope.data {
                Value::Bool(smoking) => Ok(Self::SmokeUpdate(SmokeUpdate::flag_only(smoking))),
                other => Ok(Self::SmokeUpdate(serde_json::from_value(other)?)),
            },
            "clear" => Ok(Self::Clear),
            "refresh" => Ok(Self::Refresh),
            unknown => Err(SmokelineError::invalid(format!(
                "unknown cloud event: {unknown}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ProbeNames;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn live() -> CloudEvent {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        CloudEvent::Live(LiveState {
            reading: Reading::new(225.0, 140.0, 150.0, 160.0, timestamp),
            smoking: true,
        })
    }

    #[test]
    fn test_live_event_layout() {
        let frame: Value = serde_json::from_str(&live().encode().unwrap()).unwrap();
        assert_eq!(frame["event"], json!("events"));
        assert_eq!(frame["data"]["chamberTemp"], json!(225.0));
        assert_eq!(frame["data"]["probe3Temp"], json!(160.0));
        assert_eq!(frame["data"]["smoking"], json!(true));
    }

    #[test]
    fn test_events_decode_both_forms() {
        let event = live();
        assert_eq!(CloudEvent::decode(&event.encode().unwrap()).unwrap(), event);

        let CloudEvent::Live(state) = &event else {
            unreachable!()
        };
        let nested = json!({
            "event": "events",
            "data": serde_json::to_string(state).unwrap()
        });
        assert_eq!(CloudEvent::decode(&nested.to_string()).unwrap(), event);
    }

    #[test]
    fn test_smoke_update_decode_legacy_bool() {
        let decoded = CloudEvent::decode(r#"{"event":"smokeUpdate","data":true}"#).unwrap();
        assert_eq!(decoded, CloudEvent::SmokeUpdate(SmokeUpdate::flag_only(true)));
    }

    #[test]
    fn test_smoke_update_with_names() {
        let event = CloudEvent::SmokeUpdate(SmokeUpdate::new(false, ProbeNames::default()));
        assert_eq!(CloudEvent::decode(&event.encode().unwrap()).unwrap(), event);
    }

    #[test]
    fn test_signals_ignore_payload() {
        assert_eq!(
            CloudEvent::decode(r#"{"event":"clear","data":true}"#).unwrap(),
            CloudEvent::Clear
        );
        assert_eq!(CloudEvent::decode(r#"{"event":"refresh"}"#).unwrap(), CloudEvent::Refresh);
    }

    #[test]
    fn test_unknown_event_rejected() {
        assert!(CloudEvent::decode(r#"{"event":"identity","data":1}"#).is_err());
    }
}
