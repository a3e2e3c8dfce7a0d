//! Core data types shared by the poller, the store and the notifier.

use std::{collections::HashMap, fmt};

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// Canonical key for a tracked remote channel.
///
/// Identities are case-insensitive: every constructor trims and lower-cases
/// the input, so configuration, provider responses and persisted snapshots
/// all agree on one spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let raw = raw.as_ref();
        let canonical = raw.trim().to_lowercase();
        if canonical.is_empty() || canonical.chars().any(char::is_whitespace) {
            return Err(Error::invalid_identity(raw));
        }
        Ok(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identity {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.0
    }
}

/// One poll's observation of a live channel. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveRecord {
    pub identity: Identity,
    /// Provider display name, when it differs from the login.
    pub display_name: Option<String>,
    pub title: String,
    /// Preview image URL with `{width}` and `{height}` placeholders.
    pub preview_url_template: String,
}

impl LiveRecord {
    /// Preview image URL with the size placeholders filled in.
    #[must_use]
    pub fn preview_url(&self, width: u32, height: u32) -> String {
        self.preview_url_template
            .replace("{width}", &width.to_string())
            .replace("{height}", &height.to_string())
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name
            .as_deref()
            .unwrap_or_else(|| self.identity.as_str())
    }
}

/// Identities currently live, as returned by a poll. Absent means offline.
pub type LiveSet = HashMap<Identity, LiveRecord>;

/// Handle to a posted notification: the message and the destination holding it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactRef {
    #[serde(deserialize_with = "string_or_number")]
    pub message_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub channel_id: String,
}

impl ArtifactRef {
    pub fn new(message_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            channel_id: channel_id.into(),
        }
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel_id, self.message_id)
    }
}

/// Accept ids written either as JSON strings or as bare numbers (older snapshots).
fn string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("Alice", "alice")]
    #[case("  ESL_Dota2 ", "esl_dota2")]
    #[case("bob", "bob")]
    fn identity_is_canonical(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(Identity::new(raw).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("two words")]
    fn identity_rejects_malformed(#[case] raw: &str) {
        assert!(matches!(
            Identity::new(raw),
            Err(Error::InvalidIdentity { .. })
        ));
    }

    #[test]
    fn identity_deserializes_canonical() {
        let id: Identity = serde_json::from_str("\"MixedCase\"").unwrap();
        assert_eq!(id.as_str(), "mixedcase");
    }

    #[test]
    fn preview_url_substitutes_size() {
        let record = LiveRecord {
            identity: Identity::new("alice").unwrap(),
            display_name: None,
            title: "A".into(),
            preview_url_template: "https://cdn/live_alice-{width}x{height}.jpg".into(),
        };
        assert_eq!(
            record.preview_url(1280, 720),
            "https://cdn/live_alice-1280x720.jpg"
        );
        assert_eq!(record.display_name(), "alice");
    }

    #[test]
    fn artifact_ref_accepts_numeric_ids() {
        let json = r#"{"message_id": 1234567890123, "channel_id": "42"}"#;
        let artifact: ArtifactRef = serde_json::from_str(json).unwrap();
        assert_eq!(artifact, ArtifactRef::new("1234567890123", "42"));
    }
}
