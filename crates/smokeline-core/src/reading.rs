//! Reading domain entities
//!
//! A [`Reading`] is one timestamped snapshot of the chamber and the three meat
//! probes. A [`SensorFrame`] is what the sensor host actually moves around: the
//! raw line as produced by the hardware (or the emulator), forwarded unmodified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::wire;

/// Readings strictly below this value are classified as too cold.
pub const TOO_COLD_BELOW: f64 = -30.0;

/// Readings strictly above this value are classified as too hot.
pub const TOO_HOT_ABOVE: f64 = 500.0;

/// One timestamped snapshot of chamber and probe temperatures.
///
/// Readings are never mutated after creation; buffering code copies them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// Smoking chamber temperature
    pub chamber_temp: f64,
    /// First meat probe
    pub probe1_temp: f64,
    /// Second meat probe
    pub probe2_temp: f64,
    /// Third meat probe
    pub probe3_temp: f64,
    /// When the reading was taken
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// Create a reading from its four channels.
    pub fn new(
        chamber_temp: f64,
        probe1_temp: f64,
        probe2_temp: f64,
        probe3_temp: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            chamber_temp,
            probe1_temp,
            probe2_temp,
            probe3_temp,
            timestamp,
        }
    }

    /// Sanity class of this reading (inspects chamber and probe 1 only).
    pub fn sanity(&self) -> SanityClass {
        SanityClass::classify(self.chamber_temp, self.probe1_temp)
    }

    /// True when every channel carries a finite value.
    pub fn is_finite(&self) -> bool {
        self.chamber_temp.is_finite()
            && self.probe1_temp.is_finite()
            && self.probe2_temp.is_finite()
            && self.probe3_temp.is_finite()
    }
}

/// Derived plausibility class of a reading. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SanityClass {
    /// Both inspected channels are within [-30, 500]
    Normal,
    /// A channel is below -30
    TooCold,
    /// A channel is above 500
    TooHot,
    /// A channel is missing or not numeric
    NotANumber,
}

impl SanityClass {
    /// Classify the chamber and probe-1 channels.
    ///
    /// NaN wins over too-cold, which wins over too-hot. The bounds themselves
    /// are inclusive and classify as [`SanityClass::Normal`].
    pub fn classify(chamber: f64, probe1: f64) -> Self {
        if chamber.is_nan() || probe1.is_nan() {
            Self::NotANumber
        } else if chamber < TOO_COLD_BELOW || probe1 < TOO_COLD_BELOW {
            Self::TooCold
        } else if chamber > TOO_HOT_ABOVE || probe1 > TOO_HOT_ABOVE {
            Self::TooHot
        } else {
            Self::Normal
        }
    }

    /// Human-readable label used in log messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::TooCold => "too cold",
            Self::TooHot => "too hot",
            Self::NotANumber => "NAN",
        }
    }

    /// Whether this class should be surfaced to the operator log.
    pub fn is_anomalous(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}

/// A raw sensor line as received from the hardware or produced by the emulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorFrame {
    /// Raw decoded line, without the line terminator
    pub payload: String,
    /// When the sensor host received or generated the line
    pub received_at: DateTime<Utc>,
}

impl SensorFrame {
    /// Wrap a raw payload.
    pub fn new(payload: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Self {
            payload: payload.into(),
            received_at,
        }
    }

    /// Classify the payload. Fails only when the payload is not JSON at all.
    pub fn sanity(&self) -> Result<SanityClass> {
        wire::classify_payload(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_examples() {
        assert_eq!(SanityClass::classify(100.0, -40.0), SanityClass::TooCold);
        assert_eq!(SanityClass::classify(100.0, 600.0), SanityClass::TooHot);
        assert_eq!(SanityClass::classify(100.0, f64::NAN), SanityClass::NotANumber);
        assert_eq!(SanityClass::classify(150.0, 250.0), SanityClass::Normal);
    }

    #[test]
    fn test_classify_bounds_are_inclusive() {
        assert_eq!(SanityClass::classify(100.0, -30.0), SanityClass::Normal);
        assert_eq!(SanityClass::classify(100.0, 500.0), SanityClass::Normal);
        assert_eq!(SanityClass::classify(100.0, -31.0), SanityClass::TooCold);
        assert_eq!(SanityClass::classify(100.0, 501.0), SanityClass::TooHot);
    }

    #[test]
    fn test_nan_takes_precedence() {
        assert_eq!(SanityClass::classify(f64::NAN, 900.0), SanityClass::NotANumber);
        assert_eq!(SanityClass::classify(-40.0, 600.0), SanityClass::TooCold);
    }

    #[test]
    fn test_sanity_ignores_other_probes() {
        let reading = Reading::new(100.0, 100.0, 9000.0, -9000.0, Utc::now());
        assert_eq!(reading.sanity(), SanityClass::Normal);
    }

    proptest! {
        #[test]
        fn prop_in_range_is_normal(chamber in -30.0f64..=500.0, probe in -30.0f64..=500.0) {
            prop_assert_eq!(SanityClass::classify(chamber, probe), SanityClass::Normal);
        }

        #[test]
        fn prop_above_range_is_anomalous(chamber in -30.0f64..=500.0, excess in 0.001f64..1.0e6) {
            let class = SanityClass::classify(chamber, TOO_HOT_ABOVE + excess);
            prop_assert_eq!(class, SanityClass::TooHot);
            prop_assert!(class.is_anomalous());
        }
    }
}
