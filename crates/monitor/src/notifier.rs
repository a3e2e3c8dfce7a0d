use std::sync::Arc;

use {
    async_trait::async_trait,
    streamwatch_channels::{ChatTransport, Deletion, Destination},
    streamwatch_common::{ArtifactRef, Error, Identity, LiveRecord, Result, StatusSource},
    tracing::{debug, info, warn},
};

use crate::content;

/// Result of an amend attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmendOutcome {
    /// The replacement was posted; persist this reference.
    Amended(ArtifactRef),
    /// Nothing changed externally; leave the cache as it is.
    Abandoned(String),
}

/// External side effects for one transition.
///
/// Transient transport failures surface as [`Error::Delivery`]. Targets that
/// are already gone are success.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post a "now live" notification to `destination`.
    async fn announce(
        &self,
        record: &LiveRecord,
        destination: &str,
        group: &str,
    ) -> Result<ArtifactRef>;

    /// Replace the notification referenced by `prior` with one carrying
    /// `new_title`.
    async fn amend(
        &self,
        identity: &Identity,
        new_title: &str,
        prior: &ArtifactRef,
        destination: &str,
        group: &str,
    ) -> Result<AmendOutcome>;

    /// Delete the notification referenced by `artifact`.
    async fn retract(&self, identity: &Identity, artifact: &ArtifactRef) -> Result<()>;
}

/// [`Notifier`] that posts embeds through a [`ChatTransport`].
///
/// Amend is delete-and-recreate, so the replacement lands at the bottom of the
/// channel and carries a fresh preview image.
pub struct EmbedNotifier {
    transport: Arc<dyn ChatTransport>,
    source: Arc<dyn StatusSource>,
}

impl EmbedNotifier {
    pub fn new(transport: Arc<dyn ChatTransport>, source: Arc<dyn StatusSource>) -> Self {
        Self { transport, source }
    }

    async fn resolve(&self, id: &str) -> Result<Option<Destination>> {
        self.transport
            .resolve_destination(id)
            .await
            .map_err(|e| Error::delivery(format!("resolve destination {id}: {e}")))
    }

    /// Delete a message, treating "already gone" as success.
    async fn delete(&self, artifact: &ArtifactRef) -> Result<Deletion> {
        let Some(destination) = self.resolve(&artifact.channel_id).await? else {
            debug!(artifact = %artifact, "destination gone, nothing to delete");
            return Ok(Deletion::NotFound);
        };
        self.transport
            .delete_message(&destination, &artifact.message_id)
            .await
            .map_err(|e| Error::delivery(format!("delete {artifact}: {e}")))
    }
}

#[async_trait]
impl Notifier for EmbedNotifier {
    async fn announce(
        &self,
        record: &LiveRecord,
        destination: &str,
        group: &str,
    ) -> Result<ArtifactRef> {
        let Some(dest) = self.resolve(destination).await? else {
            return Err(Error::delivery(format!(
                "destination {destination} not found"
            )));
        };

        let body = content::announce(record, group);
        let message_id = self
            .transport
            .create_message(&dest, &body)
            .await
            .map_err(|e| Error::delivery(format!("post to {destination}: {e}")))?;

        info!(
            identity = %record.identity,
            destination = %dest.id,
            message_id = %message_id,
            title = %record.title,
            "announced"
        );
        Ok(ArtifactRef::new(message_id, dest.id))
    }

    async fn amend(
        &self,
        identity: &Identity,
        new_title: &str,
        prior: &ArtifactRef,
        destination: &str,
        group: &str,
    ) -> Result<AmendOutcome> {
        let fresh = match self.source.fetch_live(std::slice::from_ref(identity)).await {
            Ok(mut live) => live.remove(identity),
            Err(e) => {
                return Ok(AmendOutcome::Abandoned(format!("fresh fetch failed: {e}")));
            },
        };
        let Some(fresh) = fresh else {
            return Ok(AmendOutcome::Abandoned("no longer live".into()));
        };
        let Some(dest) = self.resolve(destination).await? else {
            return Ok(AmendOutcome::Abandoned(format!(
                "destination {destination} no longer resolves"
            )));
        };

        let body = content::amend(&fresh, new_title, group);
        let message_id = self
            .transport
            .create_message(&dest, &body)
            .await
            .map_err(|e| Error::delivery(format!("post to {destination}: {e}")))?;
        let replacement = ArtifactRef::new(message_id, dest.id.clone());

        // The replacement exists now. Failing here would post a duplicate on
        // the next tick, so a stuck old message is only logged.
        match self.delete(prior).await {
            Ok(Deletion::Deleted) => {},
            Ok(Deletion::NotFound) => {
                debug!(identity = %identity, artifact = %prior, "previous notification already gone");
            },
            Err(e) => {
                warn!(
                    identity = %identity,
                    artifact = %prior,
                    error = %e,
                    "could not delete previous notification"
                );
            },
        }

        info!(
            identity = %identity,
            destination = %dest.id,
            message_id = %replacement.message_id,
            title = %new_title,
            "amended"
        );
        Ok(AmendOutcome::Amended(replacement))
    }

    async fn retract(&self, identity: &Identity, artifact: &ArtifactRef) -> Result<()> {
        match self.delete(artifact).await? {
            Deletion::Deleted => info!(identity = %identity, artifact = %artifact, "retracted"),
            Deletion::NotFound => {
                info!(identity = %identity, artifact = %artifact, "notification already gone")
            },
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::fakes::{FakeSource, record},
        streamwatch_channels::MemoryTransport,
    };

    fn id(raw: &str) -> Identity {
        Identity::new(raw).unwrap()
    }

    fn notifier(
        transport: &Arc<MemoryTransport>,
        source: &Arc<FakeSource>,
    ) -> EmbedNotifier {
        EmbedNotifier::new(transport.clone(), source.clone())
    }

    #[tokio::test]
    async fn announce_posts_to_destination() {
        let transport = Arc::new(MemoryTransport::with_destinations(["42"]));
        let source = Arc::new(FakeSource::new());
        let artifact = notifier(&transport, &source)
            .announce(&record("alice", "A"), "42", "dota")
            .await
            .unwrap();

        assert_eq!(artifact.channel_id, "42");
        assert!(transport.contains("42", &artifact.message_id));
    }

    #[tokio::test]
    async fn announce_to_missing_destination_is_delivery_error() {
        let transport = Arc::new(MemoryTransport::new());
        let source = Arc::new(FakeSource::new());
        let err = notifier(&transport, &source)
            .announce(&record("alice", "A"), "42", "dota")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Delivery { .. }));
    }

    #[tokio::test]
    async fn amend_replaces_message() {
        let transport = Arc::new(MemoryTransport::with_destinations(["42"]));
        let source = Arc::new(FakeSource::new());
        let n = notifier(&transport, &source);
        let old = n.announce(&record("bob", "X"), "42", "g").await.unwrap();

        source.set_live([record("bob", "Y")]);
        let outcome = n.amend(&id("bob"), "Y", &old, "42", "g").await.unwrap();

        let AmendOutcome::Amended(new) = outcome else {
            panic!("expected amend, got {outcome:?}");
        };
        assert_ne!(new, old);
        assert!(!transport.contains("42", &old.message_id));
        let messages = transport.messages("42");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1.embeds[0].title, "Y");
    }

    #[tokio::test]
    async fn amend_abandoned_when_no_longer_live() {
        let transport = Arc::new(MemoryTransport::with_destinations(["42"]));
        let source = Arc::new(FakeSource::new());
        let n = notifier(&transport, &source);
        let old = n.announce(&record("bob", "X"), "42", "g").await.unwrap();

        let outcome = n.amend(&id("bob"), "Y", &old, "42", "g").await.unwrap();
        assert!(matches!(outcome, AmendOutcome::Abandoned(_)));
        assert!(transport.contains("42", &old.message_id));
        assert_eq!(transport.create_count(), 1);
    }

    #[tokio::test]
    async fn amend_survives_stuck_old_message() {
        let transport = Arc::new(MemoryTransport::with_destinations(["42"]));
        let source = Arc::new(FakeSource::new());
        let n = notifier(&transport, &source);
        let old = n.announce(&record("bob", "X"), "42", "g").await.unwrap();

        source.set_live([record("bob", "Y")]);
        transport.set_fail_deletes(true);
        let outcome = n.amend(&id("bob"), "Y", &old, "42", "g").await.unwrap();
        assert!(matches!(outcome, AmendOutcome::Amended(_)));
        assert_eq!(transport.messages("42").len(), 2);
    }

    #[tokio::test]
    async fn retract_is_idempotent() {
        let transport = Arc::new(MemoryTransport::with_destinations(["42"]));
        let source = Arc::new(FakeSource::new());
        let n = notifier(&transport, &source);
        let artifact = n.announce(&record("alice", "A"), "42", "g").await.unwrap();

        n.retract(&id("alice"), &artifact).await.unwrap();
        n.retract(&id("alice"), &artifact).await.unwrap();
        assert_eq!(transport.delete_count(), 1);

        transport.remove_destination("42");
        n.retract(&id("alice"), &artifact).await.unwrap();
    }

    #[tokio::test]
    async fn retract_transient_failure_is_delivery_error() {
        let transport = Arc::new(MemoryTransport::with_destinations(["42"]));
        let source = Arc::new(FakeSource::new());
        let n = notifier(&transport, &source);
        let artifact = n.announce(&record("alice", "A"), "42", "g").await.unwrap();

        transport.set_fail_deletes(true);
        let err = n.retract(&id("alice"), &artifact).await.unwrap_err();
        assert!(matches!(err, Error::Delivery { .. }));
    }
}
