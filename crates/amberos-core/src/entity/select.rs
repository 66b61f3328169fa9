use std::sync::Arc;

use amberos_api::{Capability, CastCommand};
use tracing::error;

use super::media_player::send_locked;
use super::{CoordinatorBound, DeviceInfo, Entity};
use crate::coordinator::CastCoordinator;
use crate::session::DeviceSession;

/// Picks the cast output source.
#[derive(Debug)]
pub struct CastSourceSelect {
    bound: CoordinatorBound,
    cast: CastCoordinator,
}

impl CastSourceSelect {
    pub fn new(session: Arc<DeviceSession>, cast: CastCoordinator, serial: &str) -> Self {
        let unique_id = format!("{serial}_{}:source", Capability::Cast.api_key());
        Self {
            bound: CoordinatorBound::new(session, cast.poll().clone(), Capability::Cast, unique_id),
            cast,
        }
    }

    pub fn options(&self) -> Vec<String> {
        self.bound
            .handles()
            .cast
            .as_ref()
            .map(|c| c.source_list.clone())
            .unwrap_or_default()
    }

    pub fn current_option(&self) -> Option<String> {
        self.bound.handles().cast.as_ref().and_then(|c| c.source.clone())
    }

    pub async fn select_option(&self, option: &str) {
        let command = CastCommand::SelectSource(option.to_owned());
        if let Err(e) = send_locked(self.bound.session(), &self.cast, command).await {
            error!(entity = %self.bound.unique_id(), error = %e, "source select failed");
        }
    }
}

impl Entity for CastSourceSelect {
    fn unique_id(&self) -> &str {
        self.bound.unique_id()
    }

    fn capability(&self) -> Capability {
        Capability::Cast
    }

    fn available(&self) -> bool {
        self.bound.available()
    }

    fn device_info(&self) -> DeviceInfo {
        let handles = self.bound.handles();
        DeviceInfo {
            via_device: handles.serial().map(ToOwned::to_owned),
            ..self.bound.device_info(None)
        }
    }

    fn added_to_hub(&mut self) {
        self.bound.subscribe();
    }

    fn will_remove_from_hub(&mut self) {
        self.bound.unsubscribe();
    }
}
