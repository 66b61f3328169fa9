// ── Poll coordinators ──
//
// A coordinator runs one update callback on a fixed interval, records
// whether the last cycle succeeded, and accepts debounced manual refresh
// requests. Refreshes of one coordinator never overlap.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::{Mutex, MutexGuard, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::REFRESH_COOLDOWN;
use crate::error::CoreError;

/// Boxed async update callback.
pub type UpdateFn = Arc<dyn Fn() -> BoxFuture<'static, Result<(), CoreError>> + Send + Sync>;

/// Outcome of the most recent poll cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollStatus {
    pub last_update_success: bool,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Completed refreshes, successful or not.
    pub refresh_count: u64,
}

// ── PollCoordinator ──────────────────────────────────────────────

/// Periodic refresh loop around one update callback. Cheaply cloneable.
#[derive(Clone)]
pub struct PollCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    name: String,
    interval: Duration,
    cooldown: Duration,
    update: UpdateFn,
    status: watch::Sender<PollStatus>,
    /// Held for the duration of one refresh.
    running: Mutex<()>,
    /// Capacity 1: a pending request absorbs any further ones.
    refresh_tx: mpsc::Sender<()>,
    refresh_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

impl PollCoordinator {
    pub fn new<F, Fut>(name: impl Into<String>, interval: Duration, update: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CoreError>> + Send + 'static,
    {
        let update: UpdateFn = Arc::new(move || update().boxed());
        Self::from_boxed(name.into(), interval, update)
    }

    pub fn from_boxed(name: String, interval: Duration, update: UpdateFn) -> Self {
        let (status, _) = watch::channel(PollStatus::default());
        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        Self {
            inner: Arc::new(CoordinatorInner {
                name,
                interval,
                cooldown: REFRESH_COOLDOWN,
                update,
                status,
                running: Mutex::new(()),
                refresh_tx,
                refresh_rx: Mutex::new(Some(refresh_rx)),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Subscribe to status changes.
    pub fn status(&self) -> watch::Receiver<PollStatus> {
        self.inner.status.subscribe()
    }

    pub fn last_update_success(&self) -> bool {
        self.inner.status.borrow().last_update_success
    }

    /// Run one refresh now, waiting for any refresh already in progress.
    ///
    /// Failures are recorded in [`PollStatus`] and returned as
    /// [`CoreError::UpdateFailed`].
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let _running = self.inner.running.lock().await;
        let result = (self.inner.update)().await.map_err(|e| match e {
            CoreError::UpdateFailed { .. } => e,
            other => CoreError::UpdateFailed {
                message: other.to_string(),
            },
        });

        let name = &self.inner.name;
        self.inner.status.send_modify(|status| {
            status.refresh_count += 1;
            match &result {
                Ok(()) => {
                    if !status.last_update_success && status.refresh_count > 1 {
                        info!(coordinator = %name, "fetching data recovered");
                    }
                    status.last_update_success = true;
                    status.last_success = Some(Utc::now());
                    status.last_error = None;
                }
                Err(e) => {
                    if status.last_update_success || status.refresh_count == 1 {
                        error!(coordinator = %name, error = %e, "error fetching data");
                    } else {
                        debug!(coordinator = %name, error = %e, "fetch still failing");
                    }
                    status.last_update_success = false;
                    status.last_error = Some(e.to_string());
                }
            }
        });
        result
    }

    /// Ask for a refresh. Requests within the cooldown window collapse into
    /// one refresh that runs when the window closes.
    pub fn request_refresh(&self) {
        match self.inner.refresh_tx.try_send(()) {
            Ok(()) => debug!(coordinator = %self.inner.name, "refresh requested"),
            Err(mpsc::error::TrySendError::Full(())) => {}
            Err(mpsc::error::TrySendError::Closed(())) => {
                debug!(coordinator = %self.inner.name, "refresh requested after shutdown");
            }
        }
    }

    /// Start the interval loop. May be called once per coordinator.
    pub async fn spawn(&self, cancel: CancellationToken) -> Result<JoinHandle<()>, CoreError> {
        let rx = self
            .inner
            .refresh_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| {
                CoreError::Internal(format!("coordinator {} already started", self.inner.name))
            })?;

        let coordinator = self.clone();
        Ok(tokio::spawn(poll_task(coordinator, rx, cancel)))
    }
}

impl std::fmt::Debug for PollCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollCoordinator")
            .field("name", &self.inner.name)
            .field("interval", &self.inner.interval)
            .finish_non_exhaustive()
    }
}

async fn poll_task(
    coordinator: PollCoordinator,
    mut refresh_rx: mpsc::Receiver<()>,
    cancel: CancellationToken,
) {
    let inner = &coordinator.inner;
    let mut interval = tokio::time::interval(inner.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            Some(()) = refresh_rx.recv() => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(inner.cooldown) => {}
                }
                while refresh_rx.try_recv().is_ok() {}

                debug!(coordinator = %inner.name, "debounced refresh");
                let _ = coordinator.refresh().await;
                interval.reset();
            }
            _ = interval.tick() => {
                debug!(coordinator = %inner.name, "poll tick");
                let _ = coordinator.refresh().await;
            }
        }
    }
    debug!(coordinator = %inner.name, "poll task stopped");
}

// ── CastCoordinator ──────────────────────────────────────────────

/// Fast coordinator for the cast group. Holds the session's cast lock so
/// user cast commands can serialize against cast fetches.
#[derive(Clone)]
pub struct CastCoordinator {
    poll: PollCoordinator,
    lock: Arc<Mutex<()>>,
}

impl CastCoordinator {
    /// `update` must take `lock` around its own cast fetch.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        interval: Duration,
        lock: Arc<Mutex<()>>,
        update: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CoreError>> + Send + 'static,
    {
        Self {
            poll: PollCoordinator::new(name, interval, update),
            lock,
        }
    }

    /// Acquire the cast lock. Hold it across a command and its refresh
    /// request.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    pub fn request_refresh(&self) {
        self.poll.request_refresh();
    }

    pub fn poll(&self) -> &PollCoordinator {
        &self.poll
    }
}

impl std::fmt::Debug for CastCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CastCoordinator")
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}
