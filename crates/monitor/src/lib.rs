//! Reconciliation engine: diff polled live state against the cache, drive
//! announce/amend/retract side effects, and run the whole thing on a timer.

pub mod content;
pub mod error;
pub mod notifier;
pub mod reconciler;
pub mod service;

#[cfg(test)]
pub(crate) mod fakes;

pub use {
    error::{Error, Result},
    notifier::{AmendOutcome, EmbedNotifier, Notifier},
    reconciler::{Reconciler, TickReport},
    service::{MonitorService, MonitorStatus},
};
