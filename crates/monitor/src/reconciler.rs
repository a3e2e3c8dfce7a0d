//! Per-tick diff of polled live state against the cache.
//!
//! | observed | cached                  | action                             |
//! |----------|-------------------------|------------------------------------|
//! | live     | absent                  | announce, put                      |
//! | live     | same title              | none (misses reset to 0)           |
//! | live     | other title             | amend, put                         |
//! | offline  | present, within grace   | record miss                        |
//! | offline  | present, grace reached  | record miss, retract, remove       |
//! | offline  | absent                  | none                               |
//!
//! A failed notification leaves the entry untouched so the transition is
//! retried next tick.
//!
//! A tick budget is only checked between identities. Once an identity's
//! notification has gone out its cache write always follows, so an expired
//! budget defers the remaining identities to the next tick instead of
//! cutting one in half.

use std::{sync::Arc, time::Duration};

use {
    serde::Serialize,
    streamwatch_common::{ArtifactRef, Identity, LiveRecord, StatusSource},
    streamwatch_config::RouteTable,
    streamwatch_store::LiveCache,
    tokio::time::Instant,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    notifier::{AmendOutcome, Notifier},
};

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Identities polled (routed to a destination).
    pub watched: usize,
    /// Of those, how many the provider reported live.
    pub live: usize,
    pub announced: usize,
    pub amended: usize,
    pub retracted: usize,
    /// Offline observations still within grace.
    pub missed: usize,
    /// Live again after misses; counter reset.
    pub reset: usize,
    pub unchanged: usize,
    /// Amends dropped because the channel went offline meanwhile.
    pub abandoned: usize,
    /// Notifications that failed and will be retried.
    pub failed: usize,
    /// Identities left for the next tick because the budget ran out.
    pub deferred: usize,
}

struct Target {
    identity: Identity,
    destination: String,
    group: String,
}

/// Drives the notifier from the difference between the poll and the cache.
///
/// Holds no state between ticks besides the cache itself.
pub struct Reconciler {
    routes: RouteTable,
    source: Arc<dyn StatusSource>,
    notifier: Arc<dyn Notifier>,
    cache: LiveCache,
}

impl Reconciler {
    pub fn new(
        routes: RouteTable,
        source: Arc<dyn StatusSource>,
        notifier: Arc<dyn Notifier>,
        cache: LiveCache,
    ) -> Self {
        Self {
            routes,
            source,
            notifier,
            cache,
        }
    }

    pub fn cache(&self) -> &LiveCache {
        &self.cache
    }

    /// Identities with a destination, in identity order.
    pub fn watched(&self) -> Vec<Identity> {
        self.targets().into_iter().map(|t| t.identity).collect()
    }

    fn targets(&self) -> Vec<Target> {
        self.routes
            .iter()
            .filter_map(|(identity, route)| {
                route.destination.as_ref().map(|destination| Target {
                    identity: identity.clone(),
                    destination: destination.clone(),
                    group: route.group.clone(),
                })
            })
            .collect()
    }

    /// Run one reconciliation pass.
    ///
    /// Only a failed poll aborts the tick; per-identity failures are logged
    /// and counted.
    pub async fn tick(&mut self) -> Result<TickReport> {
        self.tick_within(None).await
    }

    /// Like [`Reconciler::tick`], bounded by `budget`.
    ///
    /// The poll is abandoned with [`Error::Deadline`] if it outlasts the
    /// budget. After that, identities not yet started when the budget runs
    /// out are counted as deferred; the one in flight always finishes.
    pub async fn tick_within(&mut self, budget: Option<Duration>) -> Result<TickReport> {
        let deadline = budget.and_then(|b| Instant::now().checked_add(b));
        let targets = self.targets();
        let identities: Vec<Identity> = targets.iter().map(|t| t.identity.clone()).collect();

        let poll = self.source.fetch_live(&identities);
        let polled = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, poll)
                .await
                .map_err(|_| Error::Deadline {
                    secs: budget.map_or(0, |b| b.as_secs()),
                })?,
            None => poll.await,
        };
        let mut live = polled.map_err(Error::Poll)?;

        let mut report = TickReport {
            watched: targets.len(),
            live: live.len(),
            ..TickReport::default()
        };

        for (done, target) in targets.iter().enumerate() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                report.deferred = targets.len() - done;
                warn!(
                    deferred = report.deferred,
                    next = %target.identity,
                    "tick budget spent, deferring the rest"
                );
                break;
            }
            match live.remove(&target.identity) {
                Some(record) => self.observe_live(target, record, &mut report).await,
                None => self.observe_offline(&target.identity, &mut report).await,
            }
        }

        for (identity, entry) in self.cache.entries() {
            if !self.routes.get(identity).is_some_and(|r| r.destination.is_some()) {
                debug!(
                    identity = %identity,
                    artifact = %entry.artifact,
                    "cached channel is no longer routed, leaving it alone"
                );
            }
        }

        info!(
            watched = report.watched,
            live = report.live,
            announced = report.announced,
            amended = report.amended,
            retracted = report.retracted,
            missed = report.missed,
            reset = report.reset,
            unchanged = report.unchanged,
            abandoned = report.abandoned,
            failed = report.failed,
            deferred = report.deferred,
            "tick complete"
        );
        Ok(report)
    }

    async fn observe_live(&mut self, target: &Target, record: LiveRecord, report: &mut TickReport) {
        let identity = &target.identity;
        let Some(entry) = self.cache.get(identity).cloned() else {
            match self
                .notifier
                .announce(&record, &target.destination, &target.group)
                .await
            {
                Ok(artifact) => {
                    report.announced += 1;
                    self.put(identity, artifact, record.title).await;
                },
                Err(e) => {
                    report.failed += 1;
                    warn!(identity = %identity, error = %e, "announce failed, will retry");
                },
            }
            return;
        };

        if entry.title == record.title {
            if entry.missed_checks > 0 {
                debug!(identity = %identity, missed = entry.missed_checks, "back online, resetting misses");
                report.reset += 1;
                self.put(identity, entry.artifact, entry.title).await;
            } else {
                debug!(identity = %identity, "title unchanged");
                report.unchanged += 1;
            }
            return;
        }

        info!(
            identity = %identity,
            old = %entry.title,
            new = %record.title,
            "title changed"
        );
        match self
            .notifier
            .amend(
                identity,
                &record.title,
                &entry.artifact,
                &target.destination,
                &target.group,
            )
            .await
        {
            Ok(AmendOutcome::Amended(artifact)) => {
                report.amended += 1;
                self.put(identity, artifact, record.title).await;
            },
            Ok(AmendOutcome::Abandoned(reason)) => {
                report.abandoned += 1;
                info!(identity = %identity, reason = %reason, "amend abandoned");
            },
            Err(e) => {
                report.failed += 1;
                warn!(identity = %identity, error = %e, "amend failed, will retry");
            },
        }
    }

    async fn observe_offline(&mut self, identity: &Identity, report: &mut TickReport) {
        if !self.cache.is_tracked(identity) {
            return;
        }
        match self.cache.record_miss(identity).await {
            Ok(missed) => debug!(identity = %identity, missed, "offline"),
            Err(e) => warn!(identity = %identity, error = %e, "cache write failed"),
        }
        if !self.cache.should_evict(identity) {
            report.missed += 1;
            return;
        }

        let Some(artifact) = self.cache.get(identity).map(|e| e.artifact.clone()) else {
            return;
        };
        match self.notifier.retract(identity, &artifact).await {
            Ok(()) => {
                report.retracted += 1;
                if let Err(e) = self.cache.remove(identity).await {
                    warn!(identity = %identity, error = %e, "cache write failed");
                }
            },
            Err(e) => {
                report.failed += 1;
                warn!(identity = %identity, error = %e, "retract failed, will retry");
            },
        }
    }

    async fn put(&mut self, identity: &Identity, artifact: ArtifactRef, title: String) {
        if let Err(e) = self.cache.put(identity.clone(), artifact, title).await {
            warn!(identity = %identity, error = %e, "cache write failed");
        }
    }
}
