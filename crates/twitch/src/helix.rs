use std::{collections::HashSet, time::Duration};

use {
    async_trait::async_trait,
    futures::future::join_all,
    reqwest::StatusCode,
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, warn},
};

use streamwatch_common::{Identity, LiveRecord, LiveSet, StatusSource};

use crate::{
    api::{StreamObject, StreamsResponse},
    error::{Error, Result},
    token::TokenManager,
};

/// Helix accepts at most this many `user_login` parameters per request.
pub const MAX_LOGINS_PER_REQUEST: usize = 100;

/// Connection settings for [`HelixClient`].
#[derive(Debug, Clone)]
pub struct HelixOptions {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub api_base_url: String,
    pub auth_base_url: String,
    pub timeout: Duration,
}

/// Helix client answering "which of these logins are live".
pub struct HelixClient {
    http: reqwest::Client,
    streams_url: String,
    tokens: TokenManager,
}

impl HelixClient {
    pub fn new(options: HelixOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(concat!("streamwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let tokens = TokenManager::new(
            http.clone(),
            &options.auth_base_url,
            options.client_id,
            options.client_secret,
        );
        Ok(Self {
            http,
            streams_url: format!("{}/streams", options.api_base_url.trim_end_matches('/')),
            tokens,
        })
    }

    /// Live records for the subset of `identities` currently live.
    ///
    /// Fails only when no token can be obtained. A failed chunk is logged and
    /// its identities are reported offline.
    pub async fn live_streams(&self, identities: &[Identity]) -> Result<LiveSet> {
        if identities.is_empty() {
            return Ok(LiveSet::new());
        }
        let bearer = self.tokens.bearer().await?;

        let chunks: Vec<&[Identity]> = identities.chunks(MAX_LOGINS_PER_REQUEST).collect();
        let results = join_all(
            chunks
                .iter()
                .map(|chunk| self.fetch_chunk(&bearer, chunk)),
        )
        .await;

        let requested: HashSet<&Identity> = identities.iter().collect();
        let mut live = LiveSet::new();
        let mut unauthorized = false;
        for (index, (chunk, result)) in chunks.iter().zip(results).enumerate() {
            match result {
                Ok(streams) => {
                    for stream in streams {
                        if let Some(record) = to_record(stream, &requested) {
                            live.insert(record.identity.clone(), record);
                        }
                    }
                },
                Err(e) => {
                    if matches!(e, Error::Status {
                        status: StatusCode::UNAUTHORIZED
                    }) {
                        unauthorized = true;
                    }
                    warn!(
                        chunk = index,
                        size = chunk.len(),
                        error = %e,
                        "helix chunk failed, treating its channels as offline"
                    );
                },
            }
        }

        if unauthorized {
            self.tokens.invalidate().await;
        }
        debug!(
            requested = identities.len(),
            live = live.len(),
            chunks = chunks.len(),
            "helix poll complete"
        );
        Ok(live)
    }

    async fn fetch_chunk(
        &self,
        bearer: &Secret<String>,
        chunk: &[Identity],
    ) -> Result<Vec<StreamObject>> {
        let mut query: Vec<(&str, &str)> = chunk
            .iter()
            .map(|identity| ("user_login", identity.as_str()))
            .collect();
        query.push(("first", "100"));

        let response = self
            .http
            .get(&self.streams_url)
            .query(&query)
            .header("Client-ID", self.tokens.client_id())
            .bearer_auth(bearer.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status { status });
        }
        let body: StreamsResponse = response.json().await?;
        body.data.ok_or(Error::MissingData)
    }
}

fn to_record(stream: StreamObject, requested: &HashSet<&Identity>) -> Option<LiveRecord> {
    let identity = match Identity::new(&stream.user_login) {
        Ok(identity) => identity,
        Err(e) => {
            warn!(login = %stream.user_login, error = %e, "helix returned a malformed login");
            return None;
        },
    };
    if !requested.contains(&identity) {
        debug!(identity = %identity, "ignoring unrequested stream");
        return None;
    }
    Some(LiveRecord {
        identity,
        display_name: stream.user_name.filter(|name| !name.trim().is_empty()),
        title: stream.title,
        preview_url_template: stream.thumbnail_url,
    })
}

#[async_trait]
impl StatusSource for HelixClient {
    async fn fetch_live(&self, identities: &[Identity]) -> streamwatch_common::Result<LiveSet> {
        Ok(self.live_streams(identities).await?)
    }
}
