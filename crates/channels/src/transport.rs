use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

use crate::Result;

/// A resolved place messages can be posted to (e.g. a Discord text channel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub id: String,
    /// Human-readable name, when the platform reports one.
    pub name: Option<String>,
}

impl Destination {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// Rich message body. Platforms without embeds render the plain fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embeds: Vec<Embed>,
}

impl RichContent {
    pub fn embed(embed: Embed) -> Self {
        Self {
            text: None,
            embeds: vec![embed],
        }
    }
}

/// A single embed card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

/// A message that exists on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub id: String,
    pub destination_id: String,
}

/// Outcome of a delete. Deleting something already gone is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    Deleted,
    NotFound,
}

/// The capability set the notifier needs from a chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Platform identifier (e.g. "discord").
    fn id(&self) -> &str;

    /// Look a destination up by id. `None` when it does not exist or is not
    /// visible to us.
    async fn resolve_destination(&self, id: &str) -> Result<Option<Destination>>;

    /// Post a message and return its id.
    async fn create_message(&self, destination: &Destination, content: &RichContent)
    -> Result<String>;

    async fn fetch_message(
        &self,
        destination: &Destination,
        message_id: &str,
    ) -> Result<Option<PostedMessage>>;

    async fn delete_message(&self, destination: &Destination, message_id: &str)
    -> Result<Deletion>;
}
