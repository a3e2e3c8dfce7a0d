//! Scheduler owning the single recurring reconciliation job.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    serde::Serialize,
    tokio::{
        sync::{Mutex, Notify, RwLock},
        task::JoinHandle,
        time::MissedTickBehavior,
    },
    tracing::{debug, error, info, warn},
};

use crate::{
    error::{Error, Result},
    reconciler::{Reconciler, TickReport},
};

/// Name of the one recurring job, as it appears in logs.
pub const JOB_NAME: &str = "reconcile";

/// Shortest budget a tick gets, however short the interval.
pub const MIN_TICK_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub running: bool,
    pub interval_secs: u64,
    /// Ticks that ran to completion or failed; skipped ticks are not counted.
    pub ticks: u64,
    pub last_report: Option<TickReport>,
    pub last_error: Option<String>,
}

#[derive(Default)]
struct LastTick {
    report: Option<TickReport>,
    error: Option<String>,
}

/// Runs [`Reconciler::tick`] on a fixed interval, one tick at a time.
pub struct MonitorService {
    reconciler: Mutex<Reconciler>,
    interval: Duration,
    deadline: Duration,
    timer_handle: Mutex<Option<JoinHandle<()>>>,
    wake_notify: Arc<Notify>,
    running: RwLock<bool>,
    ticks: AtomicU64,
    last: RwLock<LastTick>,
}

impl MonitorService {
    /// Budget per tick is the interval, but never under [`MIN_TICK_DEADLINE`].
    /// See [`Reconciler::tick_within`] for how it is enforced.
    pub fn new(reconciler: Reconciler, interval: Duration) -> Arc<Self> {
        Self::with_deadline(reconciler, interval, interval.max(MIN_TICK_DEADLINE))
    }

    pub fn with_deadline(reconciler: Reconciler, interval: Duration, deadline: Duration) -> Arc<Self> {
        Arc::new(Self {
            reconciler: Mutex::new(reconciler),
            interval,
            deadline,
            timer_handle: Mutex::new(None),
            wake_notify: Arc::new(Notify::new()),
            running: RwLock::new(false),
            ticks: AtomicU64::new(0),
            last: RwLock::new(LastTick::default()),
        })
    }

    /// Start the timer loop. The first tick fires immediately.
    pub async fn start(self: &Arc<Self>) {
        {
            let mut running = self.running.write().await;
            if *running {
                warn!("monitor service already running");
                return;
            }
            *running = true;
        }

        let svc = Arc::clone(self);
        let handle = tokio::spawn(async move {
            svc.timer_loop().await;
        });
        *self.timer_handle.lock().await = Some(handle);
        info!(
            job = JOB_NAME,
            interval_secs = self.interval.as_secs(),
            deadline_secs = self.deadline.as_secs(),
            "monitor service started"
        );
    }

    /// Stop the timer loop. An in-flight tick runs to completion first so
    /// every notification sent gets its cache write.
    pub async fn stop(&self) {
        *self.running.write().await = false;
        self.wake_notify.notify_one();

        let handle = self.timer_handle.lock().await.take();
        if let Some(h) = handle
            && let Err(e) = h.await
            && !e.is_cancelled()
        {
            error!(job = JOB_NAME, error = %e, "monitor loop panicked");
        }
        info!("monitor service stopped");
    }

    /// Run a tick now. Returns [`Error::Busy`] if one is already running.
    pub async fn run_now(&self) -> Result<TickReport> {
        self.run_tick().await
    }

    pub async fn status(&self) -> MonitorStatus {
        let last = self.last.read().await;
        MonitorStatus {
            running: *self.running.read().await,
            interval_secs: self.interval.as_secs(),
            ticks: self.ticks.load(Ordering::SeqCst),
            last_report: last.report,
            last_error: last.error.clone(),
        }
    }

    // ── Internal ────────────────────────────────────────────────────────

    async fn timer_loop(self: &Arc<Self>) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if !*self.running.read().await {
                break;
            }

            let notify = Arc::clone(&self.wake_notify);
            tokio::select! {
                _ = interval.tick() => {},
                () = notify.notified() => {
                    debug!("monitor loop woken by notify");
                    continue;
                },
            }

            if !*self.running.read().await {
                break;
            }

            match self.run_tick().await {
                Ok(_) => {},
                Err(Error::Busy) => info!(job = JOB_NAME, "previous tick still running, skipping"),
                Err(e) => error!(job = JOB_NAME, error = %e, "tick failed"),
            }
        }
    }

    async fn run_tick(&self) -> Result<TickReport> {
        let Ok(mut reconciler) = self.reconciler.try_lock() else {
            return Err(Error::Busy);
        };

        let result = reconciler.tick_within(Some(self.deadline)).await;
        drop(reconciler);

        self.ticks.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.write().await;
        match &result {
            Ok(report) => {
                last.report = Some(*report);
                last.error = None;
            },
            Err(e) => last.error = Some(e.to_string()),
        }
        result
    }
}
