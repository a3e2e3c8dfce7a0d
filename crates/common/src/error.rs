use thiserror::Error;

/// Failure taxonomy shared by the poller, notifier and reconciler.
///
/// The variants map onto how a tick reacts:
/// - [`Error::Credential`] aborts the current tick only.
/// - [`Error::ProviderBatch`] marks one chunk offline for this round.
/// - [`Error::Delivery`] abandons a single transition, leaving the cache as is.
///
/// A retract target that is already gone is not an error at all: transports
/// report it as `Deletion::NotFound` or an unresolved destination.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid identity: {raw:?}")]
    InvalidIdentity { raw: String },

    #[error("credential error: {message}")]
    Credential { message: String },

    #[error("provider batch failed: {message}")]
    ProviderBatch { message: String },

    #[error("delivery failed: {message}")]
    Delivery { message: String },
}

impl Error {
    #[must_use]
    pub fn invalid_identity(raw: impl Into<String>) -> Self {
        Self::InvalidIdentity { raw: raw.into() }
    }

    #[must_use]
    pub fn credential(message: impl std::fmt::Display) -> Self {
        Self::Credential {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn provider_batch(message: impl std::fmt::Display) -> Self {
        Self::ProviderBatch {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn delivery(message: impl std::fmt::Display) -> Self {
        Self::Delivery {
            message: message.to_string(),
        }
    }

    /// Whether the error is fatal to the whole tick rather than one identity.
    #[must_use]
    pub fn is_credential(&self) -> bool {
        matches!(self, Self::Credential { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// ── Shared context trait ────────────────────────────────────────────────────

/// Trait for error types that can be constructed from a plain message string.
///
/// Implement this for your crate's error type, then invoke [`impl_context!`]
/// in your error module to get `.context()` and `.with_context()` on `Result`
/// and `Option`.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Generate a crate-local `Context` trait with `.context()` and `.with_context()`
/// methods on `Result` and `Option`.
///
/// Invoke inside a module that defines `Error: FromMessage` and
/// `type Result<T> = std::result::Result<T, Error>`.
///
/// ```ignore
/// // in crates/foo/src/error.rs
/// streamwatch_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn context(self, context: impl Into<String>) -> Result<T>;
            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                let ctx = context.into();
                self.map_err(|source| {
                    <Error as $crate::FromMessage>::from_message(format!("{ctx}: {source}"))
                })
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|source| {
                    let ctx = f().into();
                    <Error as $crate::FromMessage>::from_message(format!("{ctx}: {source}"))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(context.into()))
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_credential_errors_abort_the_tick() {
        assert!(Error::credential("no token").is_credential());
        assert!(!Error::provider_batch("chunk 0").is_credential());
        assert!(!Error::delivery("boom").is_credential());
    }

    #[test]
    fn display_includes_message() {
        let err = Error::delivery("post to 42: unavailable");
        assert_eq!(err.to_string(), "delivery failed: post to 42: unavailable");
    }
}
