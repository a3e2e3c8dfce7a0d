//! Shared types, error definitions, and the status-source seam used across all
//! streamwatch crates.

pub mod error;
pub mod source;
pub mod types;

pub use {
    error::{Error, FromMessage, Result},
    source::StatusSource,
    types::{ArtifactRef, Identity, LiveRecord, LiveSet},
};
