#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The poll could not run at all (e.g. no provider token). The tick is
    /// abandoned and retried on the next interval.
    #[error("poll failed: {0}")]
    Poll(#[source] streamwatch_common::Error),

    /// The poll did not answer before the tick deadline. Nothing was notified.
    #[error("poll exceeded the {secs}s tick deadline")]
    Deadline { secs: u64 },

    #[error("a tick is already in progress")]
    Busy,
}

pub type Result<T> = std::result::Result<T, Error>;
