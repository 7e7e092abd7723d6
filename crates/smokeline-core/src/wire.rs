//! Wire formats shared by the sensor host, the bridge and the durable API
//!
//! - Local channel: `{"event":"temp","data":"<raw line>"}` where the raw line is
//!   `{"Chamber":…,"Meat":…,"Meat2":…,"Meat3":…}`.
//! - Durable API: `{"ChamberTemp":…,"MeatTemp":…,"Meat2Temp":…,"Meat3Temp":…,"date":…}`.
//!
//! Temperature fields accept either JSON numbers or numeric strings, because
//! hardware lines and historical records carry both.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Result, SmokelineError};
use crate::reading::{Reading, SanityClass};

/// Name of the local channel readings are published on.
pub const LOCAL_TEMP_EVENT: &str = "temp";

/// Envelope for one message on the local channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalMessage {
    /// Channel name, always [`LOCAL_TEMP_EVENT`] for readings
    pub event: String,
    /// Raw sensor line, forwarded unmodified
    pub data: String,
}

impl LocalMessage {
    /// Wrap a raw sensor payload for the "temp" channel.
    pub fn temp(payload: impl Into<String>) -> Self {
        Self {
            event: LOCAL_TEMP_EVENT.to_string(),
            data: payload.into(),
        }
    }

    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a JSON text frame.
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Whether this message belongs to the readings channel.
    pub fn is_temp(&self) -> bool {
        self.event == LOCAL_TEMP_EVENT
    }
}

/// Composite sensor state as encoded on the local channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalTemps {
    /// Chamber temperature
    #[serde(rename = "Chamber", deserialize_with = "lenient_f64")]
    pub chamber: f64,
    /// Probe 1
    #[serde(rename = "Meat", deserialize_with = "lenient_f64")]
    pub meat: f64,
    /// Probe 2, absent on two-channel hardware
    #[serde(rename = "Meat2", default, deserialize_with = "lenient_f64")]
    pub meat2: f64,
    /// Probe 3, absent on two-channel hardware
    #[serde(rename = "Meat3", default, deserialize_with = "lenient_f64")]
    pub meat3: f64,
}

impl LocalTemps {
    /// Encode as the raw sensor line.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a raw sensor line. Non-finite channels are rejected.
    pub fn decode(payload: &str) -> Result<Self> {
        let temps: Self = serde_json::from_str(payload.trim())?;
        let finite = [temps.chamber, temps.meat, temps.meat2, temps.meat3]
            .iter()
            .all(|value| value.is_finite());
        if !finite {
            return Err(SmokelineError::invalid(format!(
                "non-finite temperature in payload: {payload}"
            )));
        }
        Ok(temps)
    }

    /// Stamp the composite state into a [`Reading`].
    pub fn into_reading(self, timestamp: DateTime<Utc>) -> Reading {
        Reading::new(self.chamber, self.meat, self.meat2, self.meat3, timestamp)
    }
}

impl From<&Reading> for LocalTemps {
    fn from(reading: &Reading) -> Self {
        Self {
            chamber: reading.chamber_temp,
            meat: reading.probe1_temp,
            meat2: reading.probe2_temp,
            meat3: reading.probe3_temp,
        }
    }
}

/// One reading as accepted by `POST /temps/batch` and returned by `GET /temps`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempRecord {
    /// Chamber temperature
    #[serde(rename = "ChamberTemp", deserialize_with = "lenient_f64")]
    pub chamber_temp: f64,
    /// Probe 1
    #[serde(rename = "MeatTemp", deserialize_with = "lenient_f64")]
    pub meat_temp: f64,
    /// Probe 2
    #[serde(rename = "Meat2Temp", default, deserialize_with = "lenient_f64")]
    pub meat2_temp: f64,
    /// Probe 3
    #[serde(rename = "Meat3Temp", default, deserialize_with = "lenient_f64")]
    pub meat3_temp: f64,
    /// When the reading was taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// Owning temperature series, assigned by the backend
    #[serde(rename = "tempsId", default, skip_serializing_if = "Option::is_none")]
    pub temps_id: Option<String>,
}

impl TempRecord {
    /// Convert back into a reading; `fallback` stamps records stored without a date.
    pub fn to_reading(&self, fallback: DateTime<Utc>) -> Reading {
        Reading::new(
            self.chamber_temp,
            self.meat_temp,
            self.meat2_temp,
            self.meat3_temp,
            self.date.unwrap_or(fallback),
        )
    }
}

impl From<&Reading> for TempRecord {
    fn from(reading: &Reading) -> Self {
        Self {
            chamber_temp: reading.chamber_temp,
            meat_temp: reading.probe1_temp,
            meat2_temp: reading.probe2_temp,
            meat3_temp: reading.probe3_temp,
            date: Some(reading.timestamp),
            temps_id: None,
        }
    }
}

/// Classify a raw sensor payload without decoding it into a [`Reading`].
///
/// Missing or non-numeric `Chamber`/`Meat` fields classify as NaN. Only a
/// payload that is not JSON at all is an error.
pub fn classify_payload(payload: &str) -> Result<SanityClass> {
    let value: Value = serde_json::from_str(payload.trim())?;
    let chamber = coerce_number(value.get("Chamber"));
    let meat = coerce_number(value.get("Meat"));
    Ok(SanityClass::classify(chamber, meat))
}

/// Numeric coercion used by classification: numbers and numeric strings pass,
/// everything else becomes NaN.
pub fn coerce_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(text)) => text.trim().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(number) => Ok(number),
        Raw::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|e| de::Error::custom(format!("invalid temperature {text:?}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn classify(value: Value) -> SanityClass {
        classify_payload(&value.to_string()).unwrap()
    }

    #[test]
    fn test_classify_payload_examples() {
        assert_eq!(classify(json!({"Meat": -40, "Chamber": 100})), SanityClass::TooCold);
        assert_eq!(classify(json!({"Meat": 600, "Chamber": 100})), SanityClass::TooHot);
        assert_eq!(
            classify(json!({"Meat": "invalid", "Chamber": 100})),
            SanityClass::NotANumber
        );
        assert_eq!(classify(json!({"Meat": -30, "Chamber": 100})), SanityClass::Normal);
        assert_eq!(classify(json!({"Meat": 500, "Chamber": 100})), SanityClass::Normal);
        assert_eq!(classify(json!({"Meat": -31, "Chamber": 100})), SanityClass::TooCold);
        assert_eq!(classify(json!({"Meat": 501, "Chamber": 100})), SanityClass::TooHot);
    }

    #[test]
    fn test_classify_missing_fields_is_nan() {
        assert_eq!(classify(json!({"SomeOtherProperty": 100})), SanityClass::NotANumber);
        assert_eq!(classify(json!(42)), SanityClass::NotANumber);
    }

    #[test]
    fn test_classify_numeric_strings() {
        assert_eq!(classify(json!({"Meat": "120.5", "Chamber": "225"})), SanityClass::Normal);
    }

    #[test]
    fn test_classify_rejects_non_json() {
        assert_matches!(
            classify_payload("invalid json"),
            Err(SmokelineError::Serialization { .. })
        );
    }

    #[test]
    fn test_local_temps_decode_lenient() {
        let temps = LocalTemps::decode(r#"{"Chamber":"225.5","Meat":140,"Meat2":"150"}"#).unwrap();
        assert_eq!(temps.chamber, 225.5);
        assert_eq!(temps.meat, 140.0);
        assert_eq!(temps.meat2, 150.0);
        assert_eq!(temps.meat3, 0.0);
    }

    #[test]
    fn test_local_temps_decode_rejects_garbage() {
        assert!(LocalTemps::decode(r#"{"Chamber":"hot","Meat":140}"#).is_err());
        assert!(LocalTemps::decode(r#"{"Meat":140}"#).is_err());
        assert!(LocalTemps::decode(r#"{"Chamber":"NaN","Meat":140}"#).is_err());
        assert!(LocalTemps::decode("not even json").is_err());
    }

    #[test]
    fn test_temp_record_field_names() {
        let reading = Reading::new(225.0, 140.0, 150.0, 160.0, Utc::now());
        let value = serde_json::to_value(TempRecord::from(&reading)).unwrap();
        assert_eq!(value["ChamberTemp"], json!(225.0));
        assert_eq!(value["MeatTemp"], json!(140.0));
        assert_eq!(value["Meat2Temp"], json!(150.0));
        assert_eq!(value["Meat3Temp"], json!(160.0));
        assert!(value.get("tempsId").is_none());
    }

    #[test]
    fn test_temp_record_accepts_stored_strings() {
        let record: TempRecord = serde_json::from_value(json!({
            "_id": "abc",
            "ChamberTemp": "225",
            "MeatTemp": "140",
            "tempsId": "series-1",
            "date": "2024-05-01T12:00:00Z"
        }))
        .unwrap();
        assert_eq!(record.chamber_temp, 225.0);
        assert_eq!(record.meat2_temp, 0.0);
        assert_eq!(record.temps_id.as_deref(), Some("series-1"));
    }

    #[test]
    fn test_local_message_envelope() {
        let message = LocalMessage::temp(r#"{"Chamber":1,"Meat":2}"#);
        let decoded = LocalMessage::decode(&message.encode().unwrap()).unwrap();
        assert!(decoded.is_temp());
        assert_eq!(decoded.data, r#"{"Chamber":1,"Meat":2}"#);
    }
}
