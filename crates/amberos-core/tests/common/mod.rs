// Shared fake device for amberos-core integration tests.
//
// `FakeDevice` plays the vendor client: it counts fetches per group,
// records commands, and can be told to expire sessions, reject logins,
// or fail calls. Cast calls sleep briefly and flag any overlap.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use amberos_api::models::{
    Backup, Cast, Disk, Information, Network, Security, Storage, System, Upgrade, Utilization,
    Volume,
};
use amberos_api::{
    Capability, CapabilityData, CastCommand, ClientFactory, ConnectionParams, DeviceClient, Error,
};
use amberos_core::{DeviceSession, EntryConfig, ReloadRequest};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Route core logs to the test writer. Quiet unless `RUST_LOG` is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off")),
        )
        .with_target(false)
        .with_test_writer()
        .try_init();
}

// ── Faults ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    LoginInvalid,
    Timeout,
    FileIndexNotFound,
}

impl Fault {
    fn error(self) -> Error {
        match self {
            Self::LoginInvalid => Error::LoginInvalid,
            Self::Timeout => Error::Timeout { timeout_secs: 10 },
            Self::FileIndexNotFound => Error::FileIndexNotFound {
                path: "/share/missing.mp4".into(),
            },
        }
    }
}

/// A command the fake device received.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Reboot,
    Shutdown(Option<String>),
    Cast(CastCommand),
}

// ── Device state ────────────────────────────────────────────────────

#[derive(Default)]
struct DeviceState {
    serial: String,
    hostname: String,
    storage: Storage,
    fetches: Mutex<HashMap<Capability, usize>>,
    resets: Mutex<Vec<Capability>>,
    commands: Mutex<Vec<Recorded>>,
    clients_created: AtomicUsize,
    logouts: AtomicUsize,
    /// Clients with an id below this see `LoginInvalid` on every call.
    expired_below: AtomicUsize,
    reject_login: AtomicBool,
    fetch_fault: Mutex<Option<Fault>>,
    command_fault: Mutex<Option<Fault>>,
    cast_delay: Mutex<Duration>,
    cast_in_flight: AtomicBool,
    cast_overlap: AtomicBool,
}

/// Handle to a fake device. Clones share state.
#[derive(Clone)]
pub struct FakeDevice {
    state: Arc<DeviceState>,
}

impl FakeDevice {
    pub fn new(serial: &str, hostname: &str) -> Self {
        init_tracing();
        Self {
            state: Arc::new(DeviceState {
                serial: serial.into(),
                hostname: hostname.into(),
                storage: sample_storage(),
                ..DeviceState::default()
            }),
        }
    }

    pub fn factory(&self) -> Arc<dyn ClientFactory> {
        Arc::new(self.clone())
    }

    pub fn config(&self) -> EntryConfig {
        EntryConfig {
            host: format!("{}.local", self.state.hostname),
            username: "admin".into(),
            password: "secret".to_owned().into(),
            ..EntryConfig::default()
        }
    }

    /// A session on this device plus the receiving end of its reload
    /// channel.
    pub fn session(&self) -> (Arc<DeviceSession>, mpsc::UnboundedReceiver<ReloadRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = DeviceSession::new(self.config(), self.factory(), tx);
        (Arc::new(session), rx)
    }

    // ── Knobs ──

    /// Invalidate every client created so far.
    pub fn expire_sessions(&self) {
        let created = self.state.clients_created.load(Ordering::SeqCst);
        self.state.expired_below.store(created, Ordering::SeqCst);
    }

    pub fn reject_login(&self, reject: bool) {
        self.state.reject_login.store(reject, Ordering::SeqCst);
    }

    pub fn fail_fetches(&self, fault: Option<Fault>) {
        *self.state.fetch_fault.lock().unwrap() = fault;
    }

    pub fn fail_commands(&self, fault: Option<Fault>) {
        *self.state.command_fault.lock().unwrap() = fault;
    }

    pub fn set_cast_delay(&self, delay: Duration) {
        *self.state.cast_delay.lock().unwrap() = delay;
    }

    // ── Observations ──

    pub fn fetches(&self, capability: Capability) -> usize {
        self.state
            .fetches
            .lock()
            .unwrap()
            .get(&capability)
            .copied()
            .unwrap_or(0)
    }

    pub fn resets(&self) -> Vec<Capability> {
        self.state.resets.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<Recorded> {
        self.state.commands.lock().unwrap().clone()
    }

    pub fn clients_created(&self) -> usize {
        self.state.clients_created.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.state.logouts.load(Ordering::SeqCst)
    }

    pub fn cast_overlapped(&self) -> bool {
        self.state.cast_overlap.load(Ordering::SeqCst)
    }
}

impl ClientFactory for FakeDevice {
    fn create(&self, _params: &ConnectionParams) -> Result<Box<dyn DeviceClient>, Error> {
        let id = self.state.clients_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeClient {
            id,
            state: Arc::clone(&self.state),
        }))
    }
}

// ── Client ──────────────────────────────────────────────────────────

struct FakeClient {
    id: usize,
    state: Arc<DeviceState>,
}

impl FakeClient {
    fn check_session(&self) -> Result<(), Error> {
        if self.id < self.state.expired_below.load(Ordering::SeqCst) {
            return Err(Error::LoginInvalid);
        }
        Ok(())
    }

    fn command(&self, recorded: Recorded) -> Result<(), Error> {
        self.check_session()?;
        if let Some(fault) = *self.state.command_fault.lock().unwrap() {
            return Err(fault.error());
        }
        self.state.commands.lock().unwrap().push(recorded);
        Ok(())
    }

    /// Mark a cast call in flight for its duration.
    fn cast_section<T>(&self, call: impl FnOnce() -> T) -> T {
        if self.state.cast_in_flight.swap(true, Ordering::SeqCst) {
            self.state.cast_overlap.store(true, Ordering::SeqCst);
        }
        let delay = *self.state.cast_delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let result = call();
        self.state.cast_in_flight.store(false, Ordering::SeqCst);
        result
    }

    fn data(&self, capability: Capability) -> CapabilityData {
        let state = &self.state;
        match capability {
            Capability::Information => CapabilityData::Information(Information {
                serial: state.serial.clone(),
                model: "Amber Pro".into(),
                version_string: "2.4.1".into(),
                temperature: Some(41.0),
                uptime: Some(86_400),
            }),
            Capability::Network => CapabilityData::Network(Network {
                hostname: state.hostname.clone(),
                macs: vec!["00:11:32:aa:bb:cc".into()],
            }),
            Capability::Security => CapabilityData::Security(Security {
                status: "outOfDate".into(),
                status_by_check: [("malware".to_owned(), "safe".to_owned())].into(),
            }),
            Capability::Storage => CapabilityData::Storage(state.storage.clone()),
            Capability::Backup => CapabilityData::Backup(Backup {
                status: "running".into(),
                status_by_check: [("cloud".to_owned(), "running".to_owned())].into(),
            }),
            Capability::System => CapabilityData::System(System::default()),
            Capability::Upgrade => CapabilityData::Upgrade(Upgrade {
                update_available: true,
                available_version: "2.5.0".into(),
                release_notes: Some("https://example.invalid/notes".into()),
            }),
            Capability::Utilization => CapabilityData::Utilization(Utilization {
                cpu_total_load: Some(12),
                cpu_1min_load: Some(153),
                memory_size: Some(8 * 1024 * 1024 * 1024),
                network_up: Some(2048),
                ..Utilization::default()
            }),
            Capability::Cast => CapabilityData::Cast(Cast {
                is_on: true,
                playing: true,
                source: Some("HDMI".into()),
                source_list: vec!["HDMI".into(), "USB DAC".into()],
                volume_level: Some(0.4),
                media_title: Some("movie.mp4".into()),
                ..Cast::default()
            }),
        }
    }
}

impl DeviceClient for FakeClient {
    fn login(&self) -> Result<(), Error> {
        if self.state.reject_login.load(Ordering::SeqCst) {
            return Err(Error::LoginInvalid);
        }
        Ok(())
    }

    fn logout(&self) -> Result<(), Error> {
        self.state.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn update(&self, capability: Capability) -> Result<CapabilityData, Error> {
        let fetch = || {
            self.check_session()?;
            if let Some(fault) = *self.state.fetch_fault.lock().unwrap() {
                return Err(fault.error());
            }
            *self
                .state
                .fetches
                .lock()
                .unwrap()
                .entry(capability)
                .or_default() += 1;
            Ok(self.data(capability))
        };
        if capability == Capability::Cast {
            self.cast_section(fetch)
        } else {
            fetch()
        }
    }

    fn reset(&self, capability: Capability) {
        self.state.resets.lock().unwrap().push(capability);
    }

    fn reboot(&self) -> Result<(), Error> {
        self.command(Recorded::Reboot)
    }

    fn shutdown(&self, reason: Option<&str>) -> Result<(), Error> {
        self.command(Recorded::Shutdown(reason.map(ToOwned::to_owned)))
    }

    fn cast(&self, command: &CastCommand) -> Result<(), Error> {
        self.cast_section(|| self.command(Recorded::Cast(command.clone())))
    }
}

fn sample_storage() -> Storage {
    Storage {
        volumes: vec![
            Volume {
                id: "vol1".into(),
                uuid: "main_pool".into(),
                raidtype: "raid_1".into(),
                status: "normal".into(),
                size_total: Some(4 * 1024_u64.pow(4)),
                size_used: Some(1024_u64.pow(4)),
            },
            Volume {
                id: "vol2".into(),
                uuid: "backup_pool".into(),
                raidtype: "raid_5".into(),
                status: "degraded".into(),
                size_total: Some(2 * 1024_u64.pow(4)),
                size_used: Some(1024_u64.pow(4)),
            },
        ],
        disks: vec![Disk {
            id: "sda".into(),
            name: "Disk 1".into(),
            model: "WDC WD40EFRX".into(),
            fw: "82.00A82".into(),
            disk_type: "SATA".into(),
            status: "normal".into(),
            smart_status: "normal".into(),
            temp: Some(36.0),
            exceed_bad_sector_thr: false,
            below_remain_life_thr: true,
            ..Disk::default()
        }],
    }
}
