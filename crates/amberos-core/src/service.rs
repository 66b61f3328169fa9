// ── Hub services ──
//
// Registry of loaded entries keyed by device serial, and dispatch of the
// device-level service calls (reboot, shutdown, cast play) to one of them.

use std::sync::Arc;

use amberos_api::ClientFactory;
use dashmap::DashMap;
use tracing::{debug, error};

use crate::config::EntryConfig;
use crate::entry::{Entry, EntryRuntime, EntryState};
use crate::error::CoreError;

/// Directory on the device that path-based cast play resolves against
/// when the target entry is picked by entity id.
pub const SHARE_ROOT: &str = "/share";

/// A device-level service call. `serial` may be omitted when exactly one
/// entry is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    Reboot {
        serial: Option<String>,
    },
    Shutdown {
        serial: Option<String>,
        reason: Option<String>,
    },
    CastPlay {
        serial: Option<String>,
        filename: Option<String>,
        /// Target media player entity ids.
        entity_ids: Vec<String>,
    },
}

impl ServiceCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reboot { .. } => "reboot",
            Self::Shutdown { .. } => "shutdown",
            Self::CastPlay { .. } => "cast_play",
        }
    }

    fn serial(&self) -> Option<&str> {
        match self {
            Self::Reboot { serial }
            | Self::Shutdown { serial, .. }
            | Self::CastPlay { serial, .. } => serial.as_deref(),
        }
    }
}

/// All loaded entries of the integration.
#[derive(Debug, Default)]
pub struct Hub {
    entries: DashMap<String, Entry>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entry, set it up, and register it under its serial.
    pub async fn load(
        &self,
        config: EntryConfig,
        factory: Arc<dyn ClientFactory>,
    ) -> Result<Entry, CoreError> {
        let entry = Entry::new(config, factory);
        entry.setup().await?;
        self.add(entry.clone())?;
        Ok(entry)
    }

    /// Register a loaded entry under its device serial.
    pub fn add(&self, entry: Entry) -> Result<String, CoreError> {
        let serial = entry.serial().ok_or(CoreError::NotLoaded)?;
        debug!(serial = %serial, "entry registered");
        self.entries.insert(serial.clone(), entry);
        Ok(serial)
    }

    /// Unload and forget the entry with `serial`.
    pub async fn unload(&self, serial: &str) -> Result<(), CoreError> {
        let (_, entry) = self
            .entries
            .remove(serial)
            .ok_or_else(|| CoreError::EntryNotFound {
                serial: serial.to_owned(),
            })?;
        entry.unload().await;
        Ok(())
    }

    pub fn get(&self, serial: &str) -> Option<Entry> {
        self.entries.get(serial).map(|e| e.value().clone())
    }

    /// Registered serials, sorted.
    pub fn serials(&self) -> Vec<String> {
        let mut serials: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        serials.sort();
        serials
    }

    /// Serials whose last setup or reload failed, sorted. Retry with
    /// [`Entry::setup`].
    pub fn failed(&self) -> Vec<String> {
        let mut serials: Vec<String> = self
            .entries
            .iter()
            .filter(|e| matches!(e.value().current_state(), EntryState::Failed { .. }))
            .map(|e| e.key().clone())
            .collect();
        serials.sort();
        serials
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ── Dispatch ─────────────────────────────────────────────────

    /// Route a service call to its entry and run it. Routing failures are
    /// logged and returned.
    pub async fn call(&self, call: ServiceCall) -> Result<(), CoreError> {
        let result = self.dispatch(&call).await;
        if let Err(e) = &result {
            error!(service = call.name(), error = %e, "service call failed");
        }
        result
    }

    async fn dispatch(&self, call: &ServiceCall) -> Result<(), CoreError> {
        let (serial, entry) = match call.serial() {
            Some(serial) => (serial.to_owned(), self.get(serial)),
            None if self.entries.len() == 1 => {
                match self.entries.iter().next().map(|e| (e.key().clone(), e.value().clone())) {
                    Some((serial, entry)) => (serial, Some(entry)),
                    None => (String::new(), None),
                }
            }
            None => {
                if let ServiceCall::CastPlay {
                    filename,
                    entity_ids,
                    ..
                } = call
                {
                    return self.cast_play_by_entity(filename.as_deref(), entity_ids).await;
                }
                return Err(CoreError::AmbiguousEntry {
                    serials: self.serials(),
                });
            }
        };

        let entry = entry.ok_or_else(|| CoreError::EntryNotFound {
            serial: serial.clone(),
        })?;
        let runtime = entry.runtime_or_err()?;
        debug!(service = call.name(), serial = %serial, "service call");

        match call {
            ServiceCall::Reboot { .. } => runtime.session().reboot().await,
            ServiceCall::Shutdown { reason, .. } => {
                runtime.session().shutdown(reason.clone()).await
            }
            ServiceCall::CastPlay { filename, .. } => {
                let filename = require_filename(filename.as_deref(), &serial)?;
                cast_play(&runtime, filename).await
            }
        }
    }

    /// With several entries and no serial, pick the entry whose hostname
    /// appears in the first target entity id and play from its share.
    async fn cast_play_by_entity(
        &self,
        filename: Option<&str>,
        entity_ids: &[String],
    ) -> Result<(), CoreError> {
        let filename = require_filename(filename, "")?;
        let target = entity_ids.first().ok_or_else(|| CoreError::ValidationFailed {
            message: "cast play needs a serial or a target entity".into(),
        })?;

        let entries: Vec<Entry> = self.entries.iter().map(|e| e.value().clone()).collect();
        for entry in entries {
            let Some(hostname) = entry.hostname() else {
                continue;
            };
            if !target.contains(&hostname.replace('-', "_")) {
                continue;
            }
            let runtime = entry.runtime_or_err()?;
            return cast_play(&runtime, &format!("{SHARE_ROOT}/{filename}")).await;
        }

        Err(CoreError::ValidationFailed {
            message: format!("no AmberOS matches entity {target}"),
        })
    }
}

fn require_filename<'a>(filename: Option<&'a str>, serial: &str) -> Result<&'a str, CoreError> {
    match filename {
        Some(f) if !f.is_empty() => Ok(f),
        _ => Err(CoreError::ValidationFailed {
            message: format!("cast play on AmberOS {serial} needs a filename"),
        }),
    }
}

async fn cast_play(runtime: &EntryRuntime, path: &str) -> Result<(), CoreError> {
    let cast = runtime.cast();
    let _guard = cast.lock().await;
    runtime.session().cast_play(path).await?;
    cast.request_refresh();
    Ok(())
}
