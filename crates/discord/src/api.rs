//! Discord REST wire types.

use {
    serde::{Deserialize, Serialize},
    streamwatch_channels::{Embed, RichContent},
};

/// `GET /channels/{id}` response (only the fields we read).
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelObject {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Message object returned by create and fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageObject {
    pub id: String,
    pub channel_id: String,
}

/// Body of a 429 response.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitBody {
    /// Seconds to wait, possibly fractional.
    pub retry_after: f64,
    #[serde(default)]
    pub global: bool,
}

/// Error body Discord returns for most 4xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: u64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<EmbedObject>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedObject {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<UrlObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<FooterObject>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UrlObject {
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FooterObject {
    pub text: String,
}

impl From<&Embed> for EmbedObject {
    fn from(embed: &Embed) -> Self {
        Self {
            title: embed.title.clone(),
            url: embed.url.clone(),
            description: embed.description.clone(),
            color: embed.color,
            image: embed.image_url.clone().map(|url| UrlObject { url }),
            footer: embed.footer.clone().map(|text| FooterObject { text }),
        }
    }
}

impl From<&RichContent> for CreateMessage {
    fn from(content: &RichContent) -> Self {
        Self {
            content: content.text.clone(),
            embeds: content.embeds.iter().map(EmbedObject::from).collect(),
        }
    }
}
