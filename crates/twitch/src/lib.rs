//! Twitch Helix status source.
//!
//! Acquires an app access token via the client-credentials grant and asks
//! `GET /streams` which of the tracked logins are live, 100 logins per request.

pub mod api;
pub mod error;
pub mod helix;
pub mod token;

pub use {
    error::{Error, Result},
    helix::{HelixClient, HelixOptions, MAX_LOGINS_PER_REQUEST},
    token::TokenManager,
};
