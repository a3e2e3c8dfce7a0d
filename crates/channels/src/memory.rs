//! In-memory transport for testing.

use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use {async_trait::async_trait, tracing::debug};

use crate::{
    Error, Result,
    transport::{ChatTransport, Deletion, Destination, PostedMessage, RichContent},
};

#[derive(Default)]
struct State {
    destinations: HashSet<String>,
    /// (destination id, message id) → content.
    messages: BTreeMap<(String, String), RichContent>,
    next_id: u64,
}

/// In-memory transport backed by maps. No network; for tests and dry runs.
#[derive(Default)]
pub struct MemoryTransport {
    state: Mutex<State>,
    creates: AtomicUsize,
    deletes: AtomicUsize,
    fail_creates: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport that knows the given destination ids.
    pub fn with_destinations<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let transport = Self::new();
        {
            let mut state = transport.lock();
            state.destinations = ids.into_iter().map(Into::into).collect();
        }
        transport
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn remove_destination(&self, id: &str) {
        self.lock().destinations.remove(id);
    }

    /// Simulate a transient platform failure on create.
    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Simulate a transient platform failure on delete.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful creates.
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Number of deletes that removed a message.
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Messages currently posted to `destination_id`, oldest first.
    pub fn messages(&self, destination_id: &str) -> Vec<(String, RichContent)> {
        self.lock()
            .messages
            .iter()
            .filter(|((dest, _), _)| dest == destination_id)
            .map(|((_, id), content)| (id.clone(), content.clone()))
            .collect()
    }

    pub fn contains(&self, destination_id: &str, message_id: &str) -> bool {
        self.lock()
            .messages
            .contains_key(&(destination_id.to_string(), message_id.to_string()))
    }

    /// Remove a message behind the notifier's back (e.g. a moderator).
    pub fn drop_message(&self, destination_id: &str, message_id: &str) {
        self.lock()
            .messages
            .remove(&(destination_id.to_string(), message_id.to_string()));
    }
}

#[async_trait]
impl ChatTransport for MemoryTransport {
    fn id(&self) -> &str {
        "memory"
    }

    async fn resolve_destination(&self, id: &str) -> Result<Option<Destination>> {
        Ok(self
            .lock()
            .destinations
            .contains(id)
            .then(|| Destination::new(id)))
    }

    async fn create_message(
        &self,
        destination: &Destination,
        content: &RichContent,
    ) -> Result<String> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(Error::unavailable("memory transport create failure"));
        }
        let mut state = self.lock();
        if !state.destinations.contains(&destination.id) {
            return Err(Error::invalid_input(format!(
                "unknown destination {}",
                destination.id
            )));
        }
        state.next_id += 1;
        // Zero-padded so BTreeMap order matches creation order.
        let id = format!("m{:06}", state.next_id);
        state
            .messages
            .insert((destination.id.clone(), id.clone()), content.clone());
        self.creates.fetch_add(1, Ordering::SeqCst);
        debug!(destination = %destination.id, message_id = %id, "memory message created");
        Ok(id)
    }

    async fn fetch_message(
        &self,
        destination: &Destination,
        message_id: &str,
    ) -> Result<Option<PostedMessage>> {
        Ok(self
            .contains(&destination.id, message_id)
            .then(|| PostedMessage {
                id: message_id.to_string(),
                destination_id: destination.id.clone(),
            }))
    }

    async fn delete_message(&self, destination: &Destination, message_id: &str) -> Result<Deletion> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::unavailable("memory transport delete failure"));
        }
        let removed = self
            .lock()
            .messages
            .remove(&(destination.id.clone(), message_id.to_string()));
        Ok(match removed {
            Some(_) => {
                self.deletes.fetch_add(1, Ordering::SeqCst);
                Deletion::Deleted
            },
            None => Deletion::NotFound,
        })
    }
}
