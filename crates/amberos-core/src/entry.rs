// ── Integration entry lifecycle ──
//
// An `Entry` is one configured device. It owns the current
// `EntryRuntime` (session + coordinators + poll tasks) and a supervisor
// task that rebuilds the runtime when the session asks for a reload.

use std::sync::{Arc, Weak};

use amberos_api::ClientFactory;
use arc_swap::{ArcSwap, ArcSwapOption};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::EntryConfig;
use crate::coordinator::{CastCoordinator, PollCoordinator};
use crate::error::CoreError;
use crate::session::{DeviceSession, ReloadRequest};

// ── EntryRuntime ─────────────────────────────────────────────────

/// Everything that lives for one successful setup of an entry.
pub struct EntryRuntime {
    session: Arc<DeviceSession>,
    central: PollCoordinator,
    cast: CastCoordinator,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl EntryRuntime {
    /// Set up a fresh session and start both poll loops.
    pub async fn start(
        config: EntryConfig,
        factory: Arc<dyn ClientFactory>,
        reload_tx: mpsc::UnboundedSender<ReloadRequest>,
        cancel: CancellationToken,
    ) -> Result<Self, CoreError> {
        let scan_interval = config.scan_interval;
        let cast_scan_interval = config.cast_scan_interval;

        let session = Arc::new(DeviceSession::new(config, factory, reload_tx));
        session.setup().await?;
        let name = session.name();

        let central = {
            let session = Arc::clone(&session);
            PollCoordinator::new(format!("{name}_central"), scan_interval, move || {
                let session = Arc::clone(&session);
                async move { session.update().await }
            })
        };
        let cast = {
            let session = Arc::clone(&session);
            let lock = session.cast_lock();
            CastCoordinator::new(format!("{name}_cast"), cast_scan_interval, lock, move || {
                let session = Arc::clone(&session);
                async move { session.cast_update().await }
            })
        };

        let tasks = vec![
            central.spawn(cancel.clone()).await?,
            cast.poll().spawn(cancel.clone()).await?,
        ];
        debug!(entry = %name, ?scan_interval, ?cast_scan_interval, "poll tasks started");

        Ok(Self {
            session,
            central,
            cast,
            cancel,
            tasks: Mutex::new(tasks),
        })
    }

    pub fn session(&self) -> &Arc<DeviceSession> {
        &self.session
    }

    pub fn central(&self) -> &PollCoordinator {
        &self.central
    }

    pub fn cast(&self) -> &CastCoordinator {
        &self.cast
    }

    /// Stop both poll loops, wait for them, and log out.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let mut tasks = self.tasks.lock().await;
        for handle in tasks.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "poll task ended abnormally");
            }
        }
        drop(tasks);

        self.session.unload().await;
    }
}

impl std::fmt::Debug for EntryRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryRuntime")
            .field("session", &self.session)
            .field("central", &self.central)
            .field("cast", &self.cast)
            .finish_non_exhaustive()
    }
}

// ── Entry ────────────────────────────────────────────────────────

/// Load state of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    NotLoaded,
    Loaded,
    /// The last setup or supervised reload failed. The entry stays
    /// unloaded until [`Entry::setup`] succeeds.
    Failed { reason: String },
}

/// One configured device. Cheaply cloneable.
#[derive(Clone)]
pub struct Entry {
    inner: Arc<EntryInner>,
}

struct EntryInner {
    factory: Arc<dyn ClientFactory>,
    config: ArcSwap<EntryConfig>,
    runtime: ArcSwapOption<EntryRuntime>,
    /// Incremented after every successful setup or reload.
    generation: watch::Sender<u64>,
    state: watch::Sender<EntryState>,
    /// Serializes setup, reload, and unload.
    lifecycle: Mutex<()>,
    /// Child token for the current load; replaced on every setup.
    cancel_child: Mutex<CancellationToken>,
    reload_tx: mpsc::UnboundedSender<ReloadRequest>,
    reload_rx: Mutex<Option<mpsc::UnboundedReceiver<ReloadRequest>>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl Entry {
    /// Create an entry. Does NOT connect -- call [`setup()`](Self::setup).
    pub fn new(config: EntryConfig, factory: Arc<dyn ClientFactory>) -> Self {
        let (generation, _) = watch::channel(0);
        let (state, _) = watch::channel(EntryState::NotLoaded);
        let (reload_tx, reload_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(EntryInner {
                factory,
                config: ArcSwap::from_pointee(config),
                runtime: ArcSwapOption::empty(),
                generation,
                state,
                lifecycle: Mutex::new(()),
                cancel_child: Mutex::new(CancellationToken::new()),
                reload_tx,
                reload_rx: Mutex::new(Some(reload_rx)),
                supervisor: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> Arc<EntryConfig> {
        self.inner.config.load_full()
    }

    /// Current runtime, if the entry is loaded.
    pub fn runtime(&self) -> Option<Arc<EntryRuntime>> {
        self.inner.runtime.load_full()
    }

    pub fn runtime_or_err(&self) -> Result<Arc<EntryRuntime>, CoreError> {
        self.runtime().ok_or(CoreError::NotLoaded)
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.runtime.load().is_some()
    }

    /// Observe (re)loads; entity sets built from an older generation are
    /// stale.
    pub fn generation(&self) -> watch::Receiver<u64> {
        self.inner.generation.subscribe()
    }

    /// Observe load state; a failed reload shows up here as
    /// [`EntryState::Failed`].
    pub fn state(&self) -> watch::Receiver<EntryState> {
        self.inner.state.subscribe()
    }

    pub fn current_state(&self) -> EntryState {
        self.inner.state.borrow().clone()
    }

    /// Device serial of the loaded session.
    pub fn serial(&self) -> Option<String> {
        self.runtime()
            .and_then(|rt| rt.session().handles().serial().map(ToOwned::to_owned))
    }

    /// Device hostname of the loaded session.
    pub fn hostname(&self) -> Option<String> {
        self.runtime().and_then(|rt| {
            rt.session()
                .handles()
                .network
                .as_ref()
                .map(|n| n.hostname.clone())
        })
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start the session and poll loops, and the reload supervisor.
    pub async fn setup(&self) -> Result<(), CoreError> {
        let _lifecycle = self.inner.lifecycle.lock().await;
        if self.is_loaded() {
            return Ok(());
        }

        let cancel = {
            let mut child = self.inner.cancel_child.lock().await;
            if child.is_cancelled() {
                *child = CancellationToken::new();
            }
            child.clone()
        };

        self.start_runtime(&cancel).await?;
        self.spawn_supervisor(cancel).await;
        Ok(())
    }

    /// Tear down the current runtime and start a new one from scratch.
    pub async fn reload(&self) -> Result<(), CoreError> {
        let _lifecycle = self.inner.lifecycle.lock().await;
        let host = self.inner.config.load().host.clone();
        info!(entry = %host, "reloading entry");

        if let Some(runtime) = self.inner.runtime.swap(None) {
            runtime.shutdown().await;
        }

        let cancel = self.inner.cancel_child.lock().await.clone();
        if cancel.is_cancelled() {
            return Err(CoreError::NotLoaded);
        }
        self.start_runtime(&cancel).await
    }

    /// Apply new options and reload.
    pub async fn update_options(&self, config: EntryConfig) -> Result<(), CoreError> {
        debug!(entry = %config.host, "entry options updated");
        self.inner.config.store(Arc::new(config));
        if self.is_loaded() {
            self.reload().await
        } else {
            Ok(())
        }
    }

    /// Stop everything and log out. Safe to call when not loaded.
    pub async fn unload(&self) {
        self.inner.cancel_child.lock().await.cancel();

        // The supervisor may be mid-reload; let it observe the cancel.
        let supervisor = self.inner.supervisor.lock().await.take();
        if let Some(handle) = supervisor {
            let _ = handle.await;
        }

        let _lifecycle = self.inner.lifecycle.lock().await;
        if let Some(runtime) = self.inner.runtime.swap(None) {
            runtime.shutdown().await;
        }
        self.inner.state.send_replace(EntryState::NotLoaded);
        debug!(entry = %self.inner.config.load().host, "entry unloaded");
    }

    async fn start_runtime(&self, cancel: &CancellationToken) -> Result<(), CoreError> {
        let config = EntryConfig::clone(&self.inner.config.load());
        let started = EntryRuntime::start(
            config,
            Arc::clone(&self.inner.factory),
            self.inner.reload_tx.clone(),
            cancel.child_token(),
        )
        .await;

        match started {
            Ok(runtime) => {
                self.inner.runtime.store(Some(Arc::new(runtime)));
                self.inner.generation.send_modify(|g| *g += 1);
                self.inner.state.send_replace(EntryState::Loaded);
                Ok(())
            }
            Err(e) => {
                self.inner.state.send_replace(EntryState::Failed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn spawn_supervisor(&self, cancel: CancellationToken) {
        let mut supervisor = self.inner.supervisor.lock().await;
        if supervisor.is_some() {
            return;
        }
        let Some(rx) = self.inner.reload_rx.lock().await.take() else {
            return;
        };
        let entry = Arc::downgrade(&self.inner);
        *supervisor = Some(tokio::spawn(supervisor_task(entry, rx, cancel)));
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("host", &self.inner.config.load().host)
            .field("generation", &*self.inner.generation.borrow())
            .finish_non_exhaustive()
    }
}

/// Rebuilds the runtime on reload requests. Requests queued while a
/// reload runs are dropped; they refer to the session just replaced.
async fn supervisor_task(
    entry: Weak<EntryInner>,
    mut rx: mpsc::UnboundedReceiver<ReloadRequest>,
    cancel: CancellationToken,
) {
    loop {
        let request = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            request = rx.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };

        let Some(inner) = entry.upgrade() else { break };
        info!(reason = %request.reason, "reload requested");
        if let Err(e) = (Entry { inner }).reload().await {
            error!(error = %e, "entry reload failed");
        }
        while rx.try_recv().is_ok() {}
    }

    // Hand the receiver back so a later setup can supervise again.
    if let Some(inner) = entry.upgrade() {
        *inner.reload_rx.lock().await = Some(rx);
    }
    debug!("reload supervisor stopped");
}
