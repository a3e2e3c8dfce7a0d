//! Notification message bodies.

use {
    streamwatch_channels::{Embed, RichContent},
    streamwatch_common::{Identity, LiveRecord},
};

/// Twitch brand purple.
pub const EMBED_COLOR: u32 = 0x9146FF;

pub const PREVIEW_WIDTH: u32 = 1280;
pub const PREVIEW_HEIGHT: u32 = 720;

pub fn channel_url(identity: &Identity) -> String {
    format!("https://twitch.tv/{identity}")
}

/// Embed posted when a channel goes live.
pub fn announce(record: &LiveRecord, group: &str) -> RichContent {
    card(
        record,
        &record.title,
        format!("🔴 **{}** is now live!", record.display_name()),
        group,
    )
}

/// Embed that replaces the previous one after a title change.
pub fn amend(record: &LiveRecord, title: &str, group: &str) -> RichContent {
    card(
        record,
        title,
        format!("🔁 **{}** updated their stream title!", record.display_name()),
        group,
    )
}

fn card(record: &LiveRecord, title: &str, description: String, group: &str) -> RichContent {
    let preview = record.preview_url(PREVIEW_WIDTH, PREVIEW_HEIGHT);
    RichContent::embed(Embed {
        title: title.to_string(),
        url: Some(channel_url(&record.identity)),
        description: Some(description),
        color: Some(EMBED_COLOR),
        image_url: (!preview.is_empty()).then_some(preview),
        footer: (!group.is_empty()).then(|| group.to_string()),
    })
}
