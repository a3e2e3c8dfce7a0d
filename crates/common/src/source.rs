use async_trait::async_trait;

use crate::{Identity, LiveSet, Result};

/// Anything that can report which identities are live right now.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Return records for exactly the subset of `identities` currently live.
    ///
    /// A failed provider chunk is not an error here: its identities are
    /// simply absent from the result. Only failures that invalidate the whole
    /// round (e.g. [`crate::Error::Credential`]) are returned.
    async fn fetch_live(&self, identities: &[Identity]) -> Result<LiveSet>;
}
