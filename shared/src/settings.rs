//! Admin settings distributed through remote configuration.

use serde::{Deserialize, Serialize};

use crate::events::EventKind;

stored_enum! {
    AdLevel {
        Disabled => "NONE",
        Low => "LOW",
        Full => "FULL",
    }
}

/// Feature-flag style settings fetched as a single JSON blob.
///
/// Missing keys take their default value and unknown keys are ignored, so
/// older and newer blobs both parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdminSettings {
    /// Event kinds non-admin family members may read
    pub read_permissions: Vec<EventKind>,
    pub ad_level: AdLevel,
    pub photo_authorization: bool,
    pub crash_reporting_enabled: bool,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            read_permissions: EventKind::ALL.to_vec(),
            ad_level: AdLevel::Disabled,
            photo_authorization: true,
            crash_reporting_enabled: false,
        }
    }
}

impl AdminSettings {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn can_read(&self, kind: EventKind) -> bool {
        self.read_permissions.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_blob_uses_defaults() {
        let settings = AdminSettings::from_json(r#"{"adLevel":"LOW","somethingNew":42}"#).unwrap();
        assert_eq!(settings.ad_level, AdLevel::Low);
        assert!(settings.photo_authorization);
        assert_eq!(settings.read_permissions.len(), EventKind::ALL.len());
    }

    #[test]
    fn test_read_permissions() {
        let settings = AdminSettings::from_json(r#"{"readPermissions":["SLEEP","DIAPER"]}"#).unwrap();
        assert!(settings.can_read(EventKind::Sleep));
        assert!(!settings.can_read(EventKind::Drugs));
    }

    #[test]
    fn test_malformed_blob_is_an_error() {
        assert!(AdminSettings::from_json("{not json").is_err());
        assert!(AdminSettings::from_json(r#"{"adLevel":"MAXIMUM"}"#).is_err());
    }
}
