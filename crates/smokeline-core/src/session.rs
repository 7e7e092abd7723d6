//! Cooking session flag and probe naming
//!
//! The durable collaborator owns the session record; this pipeline only reads
//! it, toggles `smoking` through the single toggle endpoint, and rebroadcasts
//! the result as a [`SmokeUpdate`].

use serde::{Deserialize, Serialize};

/// The single active cooking session of a device, as returned by `GET /state`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookingSession {
    /// Identifier of the active smoke; empty when none exists
    #[serde(rename = "smokeId", default)]
    pub session_id: String,
    /// Whether cooking is active
    #[serde(default)]
    pub smoking: bool,
}

impl CookingSession {
    /// Current flag as a state-machine value.
    pub fn state(&self) -> SmokingState {
        SmokingState::from(self.smoking)
    }

    /// Whether the backend has a session record at all.
    pub fn has_session(&self) -> bool {
        !self.session_id.is_empty()
    }
}

/// The two states of the cooking flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmokingState {
    /// Not cooking
    #[default]
    Off,
    /// Cooking
    On,
}

impl SmokingState {
    /// The state a toggle moves to.
    pub fn toggled(self) -> Self {
        match self {
            Self::Off => Self::On,
            Self::On => Self::Off,
        }
    }

    /// Flag value.
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl From<bool> for SmokingState {
    fn from(smoking: bool) -> Self {
        if smoking {
            Self::On
        } else {
            Self::Off
        }
    }
}

/// Human-readable names of the four channels, from the current smoke profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeNames {
    /// Chamber label
    pub chamber_name: String,
    /// Probe 1 label
    pub probe1_name: String,
    /// Probe 2 label
    pub probe2_name: String,
    /// Probe 3 label
    pub probe3_name: String,
}

impl Default for ProbeNames {
    fn default() -> Self {
        Self {
            chamber_name: "Chamber".to_string(),
            probe1_name: "Probe 1".to_string(),
            probe2_name: "Probe 2".to_string(),
            probe3_name: "Probe 3".to_string(),
        }
    }
}

/// Payload of the `smokeUpdate` broadcast.
///
/// Older senders broadcast a bare boolean; those decode with `names: None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmokeUpdate {
    /// New flag value
    pub smoking: bool,
    /// Probe labels so receivers can repaint without a fetch
    #[serde(flatten)]
    pub names: Option<ProbeNames>,
}

impl SmokeUpdate {
    /// Build an update carrying probe names.
    pub fn new(smoking: bool, names: ProbeNames) -> Self {
        Self {
            smoking,
            names: Some(names),
        }
    }

    /// Build a flag-only update.
    pub fn flag_only(smoking: bool) -> Self {
        Self {
            smoking,
            names: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_wire_names() {
        let session: CookingSession =
            serde_json::from_value(json!({"smokeId": "abc", "smoking": true, "_id": "x"})).unwrap();
        assert_eq!(session.session_id, "abc");
        assert!(session.state().is_on());
        assert!(session.has_session());
    }

    #[test]
    fn test_smoking_state_toggle() {
        assert_eq!(SmokingState::Off.toggled(), SmokingState::On);
        assert_eq!(SmokingState::On.toggled().toggled(), SmokingState::On);
    }

    #[test]
    fn test_smoke_update_is_flat() {
        let update = SmokeUpdate::new(true, ProbeNames::default());
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(
            value,
            json!({
                "smoking": true,
                "chamberName": "Chamber",
                "probe1Name": "Probe 1",
                "probe2Name": "Probe 2",
                "probe3Name": "Probe 3"
            })
        );
        let decoded: SmokeUpdate = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, update);
    }

    #[test]
    fn test_smoke_update_without_names() {
        let decoded: SmokeUpdate = serde_json::from_value(json!({"smoking": false})).unwrap();
        assert_eq!(decoded, SmokeUpdate::flag_only(false));
    }
}
