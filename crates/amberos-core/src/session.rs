// ── Device session facade ──
//
// Owns one authenticated client and the per-group handles built from
// its fetches. Every device call runs on the blocking pool. Gate
// evaluation always completes before the fetch pass it gates. The cast
// handle is only touched under the cast lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use amberos_api::models::{
    Backup, Cast, Information, Network, Security, Storage, System, Upgrade, Utilization,
};
use amberos_api::{Capability, CapabilityData, CastCommand, ClientFactory, DeviceClient};
use arc_swap::ArcSwap;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::config::EntryConfig;
use crate::error::CoreError;
use crate::gate::{self, ActiveSet, Transition};
use crate::subscription::{Subscription, SubscriptionTable};

// ── Session state ────────────────────────────────────────────────

/// Lifecycle of a device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    /// An auth failure was seen after setup; a reload has been requested.
    Reconnecting,
    /// Setup failed before the session ever became ready.
    Failed,
}

/// Sent to the entry supervisor when the session must be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadRequest {
    pub reason: String,
}

// ── Handles ──────────────────────────────────────────────────────

/// Latest state of every capability group. A `None` field means the
/// group is inactive (or has not been fetched since it became active).
#[derive(Debug, Clone, Default)]
pub struct Handles {
    pub information: Option<Arc<Information>>,
    pub network: Option<Arc<Network>>,
    pub security: Option<Arc<Security>>,
    pub storage: Option<Arc<Storage>>,
    pub backup: Option<Arc<Backup>>,
    pub system: Option<Arc<System>>,
    pub upgrade: Option<Arc<Upgrade>>,
    pub utilization: Option<Arc<Utilization>>,
    pub cast: Option<Arc<Cast>>,
}

impl Handles {
    pub fn is_active(&self, capability: Capability) -> bool {
        match capability {
            Capability::Information => self.information.is_some(),
            Capability::Network => self.network.is_some(),
            Capability::Security => self.security.is_some(),
            Capability::Storage => self.storage.is_some(),
            Capability::Backup => self.backup.is_some(),
            Capability::System => self.system.is_some(),
            Capability::Upgrade => self.upgrade.is_some(),
            Capability::Utilization => self.utilization.is_some(),
            Capability::Cast => self.cast.is_some(),
        }
    }

    /// Groups that currently hold a handle.
    pub fn active(&self) -> ActiveSet {
        Capability::ALL
            .into_iter()
            .filter(|c| self.is_active(*c))
            .collect()
    }

    /// Device serial, once information has been fetched.
    pub fn serial(&self) -> Option<&str> {
        self.information.as_deref().map(|i| i.serial.as_str())
    }

    fn set(&mut self, data: CapabilityData) {
        match data {
            CapabilityData::Information(v) => self.information = Some(Arc::new(v)),
            CapabilityData::Network(v) => self.network = Some(Arc::new(v)),
            CapabilityData::Security(v) => self.security = Some(Arc::new(v)),
            CapabilityData::Storage(v) => self.storage = Some(Arc::new(v)),
            CapabilityData::Backup(v) => self.backup = Some(Arc::new(v)),
            CapabilityData::System(v) => self.system = Some(Arc::new(v)),
            CapabilityData::Upgrade(v) => self.upgrade = Some(Arc::new(v)),
            CapabilityData::Utilization(v) => self.utilization = Some(Arc::new(v)),
            CapabilityData::Cast(v) => self.cast = Some(Arc::new(v)),
        }
    }

    fn clear(&mut self, capability: Capability) {
        match capability {
            Capability::Information => self.information = None,
            Capability::Network => self.network = None,
            Capability::Security => self.security = None,
            Capability::Storage => self.storage = None,
            Capability::Backup => self.backup = None,
            Capability::System => self.system = None,
            Capability::Upgrade => self.upgrade = None,
            Capability::Utilization => self.utilization = None,
            Capability::Cast => self.cast = None,
        }
    }
}

// ── DeviceSession ────────────────────────────────────────────────

/// One authenticated session against one device, shared by both poll
/// coordinators and every entity of an entry.
pub struct DeviceSession {
    config: EntryConfig,
    factory: Arc<dyn ClientFactory>,
    client: Mutex<Option<Arc<dyn DeviceClient>>>,
    subscriptions: Arc<SubscriptionTable>,
    /// Bitmask of the last evaluated [`ActiveSet`].
    active: AtomicU16,
    handles: ArcSwap<Handles>,
    /// Held by every cast fetch or reset and by user cast commands.
    cast_lock: Arc<Mutex<()>>,
    initialized: AtomicBool,
    state: watch::Sender<SessionState>,
    reload_tx: mpsc::UnboundedSender<ReloadRequest>,
}

impl DeviceSession {
    /// Create a session. Does NOT log in -- call [`setup()`](Self::setup).
    pub fn new(
        config: EntryConfig,
        factory: Arc<dyn ClientFactory>,
        reload_tx: mpsc::UnboundedSender<ReloadRequest>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Uninitialized);
        Self {
            config,
            factory,
            client: Mutex::new(None),
            subscriptions: SubscriptionTable::new(),
            active: AtomicU16::new(0),
            handles: ArcSwap::from_pointee(Handles::default()),
            cast_lock: Arc::new(Mutex::new(())),
            initialized: AtomicBool::new(false),
            state,
            reload_tx,
        }
    }

    pub fn config(&self) -> &EntryConfig {
        &self.config
    }

    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// `true` once `setup()` has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Snapshot of the current handles.
    pub fn handles(&self) -> Arc<Handles> {
        self.handles.load_full()
    }

    /// Result of the most recent gate evaluation.
    pub fn active_set(&self) -> ActiveSet {
        ActiveSet::from_bits(self.active.load(Ordering::Acquire))
    }

    /// The lock serializing cast commands against cast fetches. Shared
    /// with the cast coordinator.
    pub fn cast_lock(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.cast_lock)
    }

    pub fn subscriptions(&self) -> &Arc<SubscriptionTable> {
        &self.subscriptions
    }

    /// Register an entity's interest in a capability group. Takes effect
    /// on the next poll cycle.
    pub fn subscribe(&self, capability: Capability, subscriber_id: &str) -> Subscription {
        self.subscriptions.subscribe(capability, subscriber_id)
    }

    /// Serial once known, host before that.
    pub fn name(&self) -> String {
        self.handles
            .load()
            .serial()
            .map_or_else(|| self.config.host.clone(), ToOwned::to_owned)
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Build a client, log in, and fetch every capability group once.
    ///
    /// Failures propagate; the session is left in [`SessionState::Failed`]
    /// and a client that already logged in is logged out again.
    pub async fn setup(&self) -> Result<(), CoreError> {
        self.state.send_replace(SessionState::Initializing);

        match self.try_setup().await {
            Ok(()) => {
                self.initialized.store(true, Ordering::Release);
                self.state.send_replace(SessionState::Ready);
                info!(entry = %self.name(), "device session ready");
                Ok(())
            }
            Err(e) => {
                error!(host = %self.config.host, error = %e, "device session setup failed");
                self.logout().await;
                self.active.store(0, Ordering::Release);
                self.state.send_replace(SessionState::Failed);
                Err(e)
            }
        }
    }

    async fn try_setup(&self) -> Result<(), CoreError> {
        let params = self.config.connection_params();
        let factory = Arc::clone(&self.factory);
        let client: Arc<dyn DeviceClient> = tokio::task::spawn_blocking(move || {
            let client = factory.create(&params)?;
            client.login()?;
            let client: Arc<dyn DeviceClient> = Arc::from(client);
            Ok::<_, amberos_api::Error>(client)
        })
        .await??;
        debug!(host = %self.config.host, "session authentication successful");
        *self.client.lock().await = Some(Arc::clone(&client));

        // Nothing has subscribed yet, so this activates every group.
        let transition = self.evaluate();
        debug!(active = ?transition.active, "initial gate evaluation");

        let fetched = tokio::task::spawn_blocking(move || {
            Capability::ALL
                .into_iter()
                .map(|cap| client.update(cap))
                .collect::<Result<Vec<_>, _>>()
        })
        .await??;

        self.handles.store(Arc::new(fetched.into_iter().fold(
            Handles::default(),
            |mut handles, data| {
                handles.set(data);
                handles
            },
        )));
        Ok(())
    }

    /// Log out and drop the client. Errors are logged, never returned.
    pub async fn unload(&self) {
        self.logout().await;
        self.handles.store(Arc::new(Handles::default()));
        self.active.store(0, Ordering::Release);
        self.state.send_replace(SessionState::Uninitialized);
    }

    async fn logout(&self) {
        let Some(client) = self.client.lock().await.take() else {
            return;
        };
        match tokio::task::spawn_blocking(move || client.logout()).await {
            Ok(Ok(())) => debug!(entry = %self.name(), "logged out"),
            Ok(Err(e)) => debug!(entry = %self.name(), error = %e, "logout failed (non-fatal)"),
            Err(e) => debug!(entry = %self.name(), error = %e, "logout did not complete"),
        }
    }

    // ── Poll passes ──────────────────────────────────────────────

    /// Central pass: every active non-cast group plus the identity groups,
    /// and cast if it is active but has no handle yet.
    pub async fn update(&self) -> Result<(), CoreError> {
        debug!(entry = %self.name(), "start data update");
        let result = self.central_pass().await;
        self.recover(result)
    }

    /// Cast pass: the cast group only. Other groups keep the state the
    /// last central pass gave them.
    pub async fn cast_update(&self) -> Result<(), CoreError> {
        debug!(entry = %self.name(), "start cast data update");
        let result = self.cast_pass().await;
        self.recover(result)
    }

    async fn central_pass(&self) -> Result<(), CoreError> {
        let client = self.client().await?;
        let transition = self.evaluate();

        let mut targets: Vec<Capability> = transition
            .active
            .iter()
            .filter(|c| *c != Capability::Cast)
            .collect();
        let fetch_cast =
            transition.active.contains(Capability::Cast) && self.handles.load().cast.is_none();
        if fetch_cast {
            targets.push(Capability::Cast);
        }

        let _cast = if fetch_cast || transition.deactivated.contains(Capability::Cast) {
            Some(self.cast_lock.lock().await)
        } else {
            None
        };
        self.release(transition.deactivated);
        self.fetch(client, transition.deactivated, targets).await
    }

    async fn cast_pass(&self) -> Result<(), CoreError> {
        let client = self.client().await?;
        let _cast = self.cast_lock.lock().await;
        let transition = self.evaluate_cast();
        self.release(transition.deactivated);

        let targets = if transition.active.contains(Capability::Cast) {
            vec![Capability::Cast]
        } else {
            Vec::new()
        };
        self.fetch(client, transition.deactivated, targets).await
    }

    /// Evaluate the gate and record the result. Each deactivation is
    /// reported to exactly one caller.
    fn evaluate(&self) -> Transition {
        let next = gate::evaluate(&self.subscriptions);
        let previous = ActiveSet::from_bits(self.active.swap(next.bits(), Ordering::AcqRel));
        self.transition(previous, next)
    }

    /// Like [`evaluate`](Self::evaluate), but only the cast bit moves.
    fn evaluate_cast(&self) -> Transition {
        let wanted = gate::evaluate(&self.subscriptions).contains(Capability::Cast);
        let with_cast = |bits: u16| {
            let mut set = ActiveSet::from_bits(bits);
            if wanted {
                set.insert(Capability::Cast);
            } else {
                set.remove(Capability::Cast);
            }
            set
        };
        let (Ok(bits) | Err(bits)) = self
            .active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| Some(with_cast(bits).bits()));
        let previous = ActiveSet::from_bits(bits);
        self.transition(previous, with_cast(bits))
    }

    fn transition(&self, previous: ActiveSet, next: ActiveSet) -> Transition {
        let transition = Transition::between(previous, next);

        for cap in transition.activated.iter() {
            debug!(entry = %self.name(), capability = %cap, "enable api updates");
        }
        for cap in transition.deactivated.iter() {
            debug!(entry = %self.name(), capability = %cap, "disable api updates");
        }
        transition
    }

    fn release(&self, groups: ActiveSet) {
        if groups.is_empty() {
            return;
        }
        self.handles.rcu(|current| {
            let mut next = Handles::clone(current);
            for cap in groups.iter() {
                next.clear(cap);
            }
            next
        });
    }

    /// Reset released groups on the client, then fetch `targets`. The
    /// pass is all-or-nothing: on error no handle is updated.
    async fn fetch(
        &self,
        client: Arc<dyn DeviceClient>,
        released: ActiveSet,
        targets: Vec<Capability>,
    ) -> Result<(), CoreError> {
        if released.is_empty() && targets.is_empty() {
            return Ok(());
        }

        let fetched = tokio::task::spawn_blocking(move || {
            for cap in released.iter() {
                client.reset(cap);
            }
            targets
                .into_iter()
                .map(|cap| client.update(cap))
                .collect::<Result<Vec<_>, _>>()
        })
        .await??;

        // A group deactivated while its fetch was in flight stays empty.
        let active = self.active_set();
        self.handles.rcu(|current| {
            let mut next = Handles::clone(current);
            for data in fetched.iter().filter(|d| active.contains(d.capability())) {
                next.set(data.clone());
            }
            next
        });
        Ok(())
    }

    /// Auth failures after setup become a reload request and are
    /// swallowed. Everything else is returned unchanged.
    fn recover(&self, result: Result<(), CoreError>) -> Result<(), CoreError> {
        match result {
            Err(e) if e.is_auth_failure() && self.is_initialized() => {
                warn!(entry = %self.name(), error = %e, "session expired, reloading entry");
                self.request_reload(e.to_string());
                Ok(())
            }
            other => other,
        }
    }

    fn request_reload(&self, reason: String) {
        let transitioned = self.state.send_if_modified(|state| {
            if *state == SessionState::Ready {
                *state = SessionState::Reconnecting;
                true
            } else {
                false
            }
        });
        if !transitioned {
            debug!(entry = %self.name(), "reload already requested");
            return;
        }
        if self.reload_tx.send(ReloadRequest { reason }).is_err() {
            warn!(entry = %self.name(), "no supervisor to handle reload request");
        }
    }

    async fn client(&self) -> Result<Arc<dyn DeviceClient>, CoreError> {
        self.client.lock().await.clone().ok_or(CoreError::NotLoaded)
    }

    // ── Commands ─────────────────────────────────────────────────

    pub async fn reboot(&self) -> Result<(), CoreError> {
        self.command("reboot", |client| client.reboot()).await
    }

    pub async fn shutdown(&self, reason: Option<String>) -> Result<(), CoreError> {
        self.command("shutdown", move |client| client.shutdown(reason.as_deref()))
            .await
    }

    /// Play a file from the device by path.
    pub async fn cast_play(&self, path: &str) -> Result<(), CoreError> {
        let command = CastCommand::PlayMedia {
            session_id: self.config.instance_id.clone(),
            media_type: String::new(),
            media_id: path.to_owned(),
            from_player: false,
        };
        self.command("cast play", move |client| client.cast(&command))
            .await
    }

    /// Forward a cast command. Callers hold the cast lock.
    pub async fn cast_command(&self, command: CastCommand) -> Result<(), CoreError> {
        self.command("cast command", move |client| client.cast(&command))
            .await
    }

    /// Run a pass-through command. Login-invalid and capability-unavailable
    /// failures are logged and reported as success.
    async fn command<F>(&self, name: &'static str, call: F) -> Result<(), CoreError>
    where
        F: FnOnce(&dyn DeviceClient) -> Result<(), amberos_api::Error> + Send + 'static,
    {
        let client = self.client().await?;
        let result = tokio::task::spawn_blocking(move || call(client.as_ref())).await?;

        match result {
            Ok(()) => {
                debug!(entry = %self.name(), command = name, "command sent");
                Ok(())
            }
            Err(e) if e.is_login_invalid() => {
                error!(
                    entry = %self.name(),
                    command = name,
                    "{name} not possible, please try again later"
                );
                debug!(error = %e, "command failed");
                Ok(())
            }
            Err(e) if e.is_capability_unavailable() => {
                error!(entry = %self.name(), command = name, error = %e, "{name} not possible");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("host", &self.config.host)
            .field("state", &self.current_state())
            .field("active", &self.active_set())
            .finish_non_exhaustive()
    }
}
