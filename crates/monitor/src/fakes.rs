//! Test doubles for the status source and the notifier.

use std::{
    collections::HashSet,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
};

use {
    async_trait::async_trait,
    streamwatch_common::{ArtifactRef, Error, Identity, LiveRecord, LiveSet, Result, StatusSource},
};

use crate::notifier::{AmendOutcome, Notifier};

pub fn record(login: &str, title: &str) -> LiveRecord {
    LiveRecord {
        identity: Identity::new(login).unwrap_or_else(|e| panic!("{e}")),
        display_name: None,
        title: title.into(),
        preview_url_template: format!("https://cdn/{login}-{{width}}x{{height}}.jpg"),
    }
}

/// Status source serving a fixed live set.
#[derive(Default)]
pub struct FakeSource {
    live: Mutex<LiveSet>,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_live(&self, records: impl IntoIterator<Item = LiveRecord>) {
        let mut live = self.live.lock().unwrap_or_else(|e| e.into_inner());
        *live = records
            .into_iter()
            .map(|r| (r.identity.clone(), r))
            .collect();
    }

    pub fn set_all_offline(&self) {
        self.live.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Fail every fetch with a credential error.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for FakeSource {
    async fn fetch_live(&self, identities: &[Identity]) -> Result<LiveSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::credential("token endpoint unreachable"));
        }
        let live = self.live.lock().unwrap_or_else(|e| e.into_inner());
        Ok(identities
            .iter()
            .filter_map(|id| live.get(id).map(|r| (id.clone(), r.clone())))
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Announce { identity: Identity, title: String },
    Amend { identity: Identity, title: String, prior: ArtifactRef },
    Retract { identity: Identity, artifact: ArtifactRef },
}

/// Notifier that records every call and hands out sequential artifacts.
#[derive(Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicU64,
    failing: Mutex<HashSet<Identity>>,
    abandon_amends: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Make every operation for `identity` fail with a delivery error.
    pub fn set_failing(&self, identity: &Identity, failing: bool) {
        let mut set = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        if failing {
            set.insert(identity.clone());
        } else {
            set.remove(identity);
        }
    }

    pub fn set_abandon_amends(&self, abandon: bool) {
        self.abandon_amends.store(abandon, Ordering::SeqCst);
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
    }

    fn check(&self, identity: &Identity) -> Result<()> {
        if self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(identity)
        {
            return Err(Error::delivery("injected failure"));
        }
        Ok(())
    }

    fn next_artifact(&self, destination: &str) -> ArtifactRef {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        ArtifactRef::new(id.to_string(), destination)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn announce(
        &self,
        record: &LiveRecord,
        destination: &str,
        _group: &str,
    ) -> Result<ArtifactRef> {
        self.push(Call::Announce {
            identity: record.identity.clone(),
            title: record.title.clone(),
        });
        self.check(&record.identity)?;
        Ok(self.next_artifact(destination))
    }

    async fn amend(
        &self,
        identity: &Identity,
        new_title: &str,
        prior: &ArtifactRef,
        destination: &str,
        _group: &str,
    ) -> Result<AmendOutcome> {
        self.push(Call::Amend {
            identity: identity.clone(),
            title: new_title.to_string(),
            prior: prior.clone(),
        });
        self.check(identity)?;
        if self.abandon_amends.load(Ordering::SeqCst) {
            return Ok(AmendOutcome::Abandoned("no longer live".into()));
        }
        Ok(AmendOutcome::Amended(self.next_artifact(destination)))
    }

    async fn retract(&self, identity: &Identity, artifact: &ArtifactRef) -> Result<()> {
        self.push(Call::Retract {
            identity: identity.clone(),
            artifact: artifact.clone(),
        });
        self.check(identity)
    }
}
