//! Helix wire types.

use serde::Deserialize;

/// Client-credentials token response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

/// `GET /streams` response. `data` is optional so a malformed body is
/// reported as such rather than as a JSON error.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamsResponse {
    #[serde(default)]
    pub data: Option<Vec<StreamObject>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamObject {
    pub user_login: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub title: String,
    /// Preview URL with `{width}x{height}` placeholders.
    #[serde(default)]
    pub thumbnail_url: String,
}
