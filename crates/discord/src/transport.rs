use std::time::Duration;

use {
    async_trait::async_trait,
    reqwest::{
        RequestBuilder, Response, StatusCode,
        header::{AUTHORIZATION, RETRY_AFTER},
    },
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, warn},
};

use streamwatch_channels::{
    ChatTransport, Deletion, Destination, Error, PostedMessage, Result, RichContent,
};

use crate::api::{ChannelObject, CreateMessage, ErrorBody, MessageObject, RateLimitBody};

/// How many times a rate-limited request is retried before giving up.
pub const MAX_RATE_LIMIT_RETRIES: usize = 4;

/// Upper bound on a single rate-limit wait.
const MAX_RETRY_WAIT_SECS: f64 = 60.0;

/// Discord transport over the REST API with a bot token.
pub struct DiscordTransport {
    client: reqwest::Client,
    token: Secret<String>,
    base_url: String,
}

impl DiscordTransport {
    pub fn new(
        token: Secret<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("streamwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::external("build discord http client", e))?;
        Ok(Self {
            client,
            token,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a request, sleeping through 429s up to [`MAX_RATE_LIMIT_RETRIES`].
    async fn send_with_retry<F>(&self, operation: &'static str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0usize;

        loop {
            let response = build()
                .header(
                    AUTHORIZATION,
                    format!("Bot {}", self.token.expose_secret()),
                )
                .send()
                .await
                .map_err(|e| Error::external(format!("discord {operation}"), e))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            let wait = retry_after(response).await;
            if retries >= MAX_RATE_LIMIT_RETRIES {
                warn!(
                    operation,
                    retries,
                    max_retries = MAX_RATE_LIMIT_RETRIES,
                    retry_after_ms = wait.as_millis() as u64,
                    "discord rate limit persisted after retries"
                );
                return Err(Error::RateLimited { retries });
            }

            retries += 1;
            warn!(
                operation,
                retries,
                max_retries = MAX_RATE_LIMIT_RETRIES,
                retry_after_ms = wait.as_millis() as u64,
                "discord rate limited, waiting before retry"
            );
            tokio::time::sleep(wait).await;
        }
    }
}

/// Wait requested by a 429. The JSON body is authoritative; the header is the
/// fallback.
async fn retry_after(response: Response) -> Duration {
    let header = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok());
    let body = response
        .json::<RateLimitBody>()
        .await
        .ok()
        .map(|b| b.retry_after);

    let secs = body
        .or(header)
        .filter(|s| s.is_finite())
        .unwrap_or(1.0)
        .clamp(0.0, MAX_RETRY_WAIT_SECS);
    Duration::from_secs_f64(secs)
}

async fn status_error(operation: &str, response: Response) -> Error {
    let status = response.status();
    let detail = response
        .json::<ErrorBody>()
        .await
        .map(|b| format!(" (code {}: {})", b.code, b.message))
        .unwrap_or_default();
    let message = format!("discord {operation} returned {status}{detail}");

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::forbidden(message),
        s if s.is_server_error() => Error::unavailable(message),
        _ => Error::invalid_input(message),
    }
}

/// Discord ids are numeric snowflakes.
fn is_snowflake(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

#[async_trait]
impl ChatTransport for DiscordTransport {
    fn id(&self) -> &str {
        "discord"
    }

    async fn resolve_destination(&self, id: &str) -> Result<Option<Destination>> {
        if !is_snowflake(id) {
            debug!(channel_id = id, "not a discord channel id");
            return Ok(None);
        }
        let url = self.url(&format!("/channels/{id}"));
        let response = self
            .send_with_retry("get channel", || self.client.get(&url))
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => {
                debug!(channel_id = id, status = %response.status(), "discord channel not visible");
                Ok(None)
            },
            s if s.is_success() => {
                let channel: ChannelObject = response
                    .json()
                    .await
                    .map_err(|e| Error::external("decode discord channel", e))?;
                Ok(Some(Destination {
                    id: channel.id,
                    name: channel.name,
                }))
            },
            _ => Err(status_error("get channel", response).await),
        }
    }

    async fn create_message(
        &self,
        destination: &Destination,
        content: &RichContent,
    ) -> Result<String> {
        let url = self.url(&format!("/channels/{}/messages", destination.id));
        let body = CreateMessage::from(content);
        let response = self
            .send_with_retry("create message", || self.client.post(&url).json(&body))
            .await?;

        if !response.status().is_success() {
            return Err(status_error("create message", response).await);
        }
        let message: MessageObject = response
            .json()
            .await
            .map_err(|e| Error::external("decode discord message", e))?;
        debug!(channel_id = %message.channel_id, message_id = %message.id, "discord message created");
        Ok(message.id)
    }

    async fn fetch_message(
        &self,
        destination: &Destination,
        message_id: &str,
    ) -> Result<Option<PostedMessage>> {
        if !is_snowflake(message_id) {
            return Ok(None);
        }
        let url = self.url(&format!(
            "/channels/{}/messages/{message_id}",
            destination.id
        ));
        let response = self
            .send_with_retry("fetch message", || self.client.get(&url))
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let message: MessageObject = response
                    .json()
                    .await
                    .map_err(|e| Error::external("decode discord message", e))?;
                Ok(Some(PostedMessage {
                    id: message.id,
                    destination_id: message.channel_id,
                }))
            },
            _ => Err(status_error("fetch message", response).await),
        }
    }

    async fn delete_message(
        &self,
        destination: &Destination,
        message_id: &str,
    ) -> Result<Deletion> {
        if !is_snowflake(message_id) {
            return Ok(Deletion::NotFound);
        }
        let url = self.url(&format!(
            "/channels/{}/messages/{message_id}",
            destination.id
        ));
        let response = self
            .send_with_retry("delete message", || self.client.delete(&url))
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(Deletion::NotFound),
            s if s.is_success() => Ok(Deletion::Deleted),
            _ => Err(status_error("delete message", response).await),
        }
    }
}
