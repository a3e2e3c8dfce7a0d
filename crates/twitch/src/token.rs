use std::time::{Duration, Instant};

use {
    secrecy::{ExposeSecret, Secret},
    tokio::sync::Mutex,
    tracing::{debug, info},
};

use crate::{
    api::TokenResponse,
    error::{Error, Result},
};

/// A token is treated as expired this long before its stated lifetime ends.
const EXPIRY_SKEW: Duration = Duration::from_secs(30);

struct CachedToken {
    access_token: Secret<String>,
    expires_at: Instant,
}

impl CachedToken {
    fn is_usable(&self, now: Instant) -> bool {
        now + EXPIRY_SKEW < self.expires_at
    }
}

/// App access token holder for the client-credentials grant.
///
/// The token is fetched lazily and refreshed when missing or about to expire.
/// There is no background refresh.
pub struct TokenManager {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: Secret<String>,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenManager {
    pub fn new(
        http: reqwest::Client,
        auth_base_url: &str,
        client_id: impl Into<String>,
        client_secret: Secret<String>,
    ) -> Self {
        Self {
            http,
            token_url: format!("{}/token", auth_base_url.trim_end_matches('/')),
            client_id: client_id.into(),
            client_secret,
            cached: Mutex::new(None),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// A bearer token valid for at least the skew window.
    ///
    /// Concurrent callers wait on the same refresh.
    pub async fn bearer(&self) -> Result<Secret<String>> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && token.is_usable(Instant::now())
        {
            return Ok(token.access_token.clone());
        }

        let token = self.request_token().await?;
        let bearer = token.access_token.clone();
        *cached = Some(token);
        Ok(bearer)
    }

    /// Drop the cached token so the next call refreshes it.
    pub async fn invalidate(&self) {
        if self.cached.lock().await.take().is_some() {
            debug!("twitch token invalidated");
        }
    }

    async fn request_token(&self) -> Result<CachedToken> {
        if self.client_id.trim().is_empty() {
            return Err(Error::MissingCredentials { field: "client_id" });
        }
        if self.client_secret.expose_secret().trim().is_empty() {
            return Err(Error::MissingCredentials {
                field: "client_secret",
            });
        }

        let response = self
            .http
            .post(&self.token_url)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret().as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(Error::token)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::token(format!("{status}: {}", body.trim())));
        }

        let parsed: TokenResponse = response.json().await.map_err(Error::token)?;
        let expires_at = Instant::now()
            .checked_add(Duration::from_secs(parsed.expires_in))
            .ok_or_else(|| Error::token(format!("expires_in {} is out of range", parsed.expires_in)))?;
        info!(expires_in = parsed.expires_in, "twitch app token acquired");
        Ok(CachedToken {
            access_token: Secret::new(parsed.access_token),
            expires_at,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, mockito::Matcher, serde_json::json};

    fn manager(server: &mockito::Server, secret: &str) -> TokenManager {
        TokenManager::new(
            reqwest::Client::new(),
            &server.url(),
            "cid",
            Secret::new(secret.into()),
        )
    }

    async fn token_mock(
        server: &mut mockito::Server,
        expires_in: u64,
        hits: usize,
    ) -> mockito::Mock {
        server
            .mock("POST", "/token")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("client_id".into(), "cid".into()),
                Matcher::UrlEncoded("client_secret".into(), "shh".into()),
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({ "access_token": "tok", "expires_in": expires_in, "token_type": "bearer" })
                    .to_string(),
            )
            .expect(hits)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn token_is_reused_until_expiry() {
        let mut server = mockito::Server::new_async().await;
        let mock = token_mock(&mut server, 3600, 1).await;

        let tokens = manager(&server, "shh");
        assert_eq!(tokens.bearer().await.unwrap().expose_secret(), "tok");
        assert_eq!(tokens.bearer().await.unwrap().expose_secret(), "tok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn token_inside_skew_window_is_refreshed() {
        let mut server = mockito::Server::new_async().await;
        let mock = token_mock(&mut server, 10, 2).await;

        let tokens = manager(&server, "shh");
        tokens.bearer().await.unwrap();
        tokens.bearer().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn absurd_expiry_is_a_token_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = token_mock(&mut server, u64::MAX, 1).await;

        let err = manager(&server, "shh").bearer().await.unwrap_err();
        assert!(matches!(err, Error::Token { .. }));
        assert!(err.to_string().contains("out of range"));
    }

    #[tokio::test]
    async fn invalidate_forces_refresh() {
        let mut server = mockito::Server::new_async().await;
        let mock = token_mock(&mut server, 3600, 2).await;

        let tokens = manager(&server, "shh");
        tokens.bearer().await.unwrap();
        tokens.invalidate().await;
        tokens.bearer().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_secret_never_hits_the_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = manager(&server, "  ").bearer().await.unwrap_err();
        assert!(matches!(err, Error::MissingCredentials {
            field: "client_secret"
        }));
        assert!(err.is_credential());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_credentials_are_credential_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"status":400,"message":"invalid client secret"}"#)
            .create_async()
            .await;

        let err = manager(&server, "shh").bearer().await.unwrap_err();
        assert!(err.is_credential());
        assert!(err.to_string().contains("invalid client secret"));
        assert!(streamwatch_common::Error::from(err).is_credential());
    }
}
