#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("twitch {field} is not configured")]
    MissingCredentials { field: &'static str },

    #[error("token request failed: {message}")]
    Token { message: String },

    #[error("helix returned {status}")]
    Status { status: reqwest::StatusCode },

    #[error("helix response has no `data` field")]
    MissingData,

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl Error {
    #[must_use]
    pub fn token(message: impl std::fmt::Display) -> Self {
        Self::Token {
            message: message.to_string(),
        }
    }

    /// Whether this error means no usable bearer token could be obtained.
    #[must_use]
    pub fn is_credential(&self) -> bool {
        matches!(self, Self::MissingCredentials { .. } | Self::Token { .. })
    }
}

impl From<Error> for streamwatch_common::Error {
    fn from(err: Error) -> Self {
        if err.is_credential() {
            Self::credential(err)
        } else {
            Self::provider_batch(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
