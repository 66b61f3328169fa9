// ── Cast media player ──
//
// Every command takes the cast lock, sends one blocking call, and asks
// the cast coordinator for a debounced refresh before releasing the lock.

use std::sync::Arc;

use amberos_api::models::Cast;
use amberos_api::{Capability, CastCommand, RepeatMode};
use arc_swap::ArcSwapOption;
use tracing::{debug, error};

use super::{CoordinatorBound, DeviceInfo, Entity};
use crate::coordinator::CastCoordinator;
use crate::error::CoreError;
use crate::session::DeviceSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Off,
    Playing,
    Paused,
}

/// Media player for the device's cast output.
#[derive(Debug)]
pub struct CastPlayer {
    bound: CoordinatorBound,
    cast: CastCoordinator,
    /// Last source picked through this player; volume commands target it.
    audio_output: ArcSwapOption<String>,
}

impl CastPlayer {
    pub fn new(session: Arc<DeviceSession>, cast: CastCoordinator, serial: &str) -> Self {
        let unique_id = format!("{serial}_{}:player", Capability::Cast.api_key());
        Self {
            bound: CoordinatorBound::new(session, cast.poll().clone(), Capability::Cast, unique_id),
            cast,
            audio_output: ArcSwapOption::empty(),
        }
    }

    fn with_cast<T>(&self, read: impl FnOnce(&Cast) -> T) -> Option<T> {
        self.bound.handles().cast.as_deref().map(read)
    }

    // ── State ────────────────────────────────────────────────────

    pub fn state(&self) -> Option<PlayerState> {
        self.with_cast(|c| match (c.is_on, c.playing) {
            (false, _) => PlayerState::Off,
            (true, true) => PlayerState::Playing,
            (true, false) => PlayerState::Paused,
        })
    }

    pub fn source(&self) -> Option<String> {
        self.with_cast(|c| c.source.clone()).flatten()
    }

    pub fn source_list(&self) -> Vec<String> {
        self.with_cast(|c| c.source_list.clone()).unwrap_or_default()
    }

    pub fn volume_level(&self) -> Option<f64> {
        self.with_cast(|c| c.volume_level).flatten()
    }

    pub fn is_volume_muted(&self) -> Option<bool> {
        self.with_cast(|c| c.muted)
    }

    pub fn media_title(&self) -> Option<String> {
        self.with_cast(|c| c.media_title.clone()).flatten()
    }

    pub fn media_content_id(&self) -> Option<String> {
        self.with_cast(|c| c.channel_name.clone()).flatten()
    }

    /// Seconds.
    pub fn media_duration(&self) -> Option<u64> {
        self.with_cast(|c| c.duration).flatten()
    }

    pub fn audio_output(&self) -> Option<String> {
        self.audio_output.load_full().map(|s| String::clone(&s))
    }

    // ── Commands ─────────────────────────────────────────────────

    pub async fn turn_on(&self) {
        self.send(CastCommand::TurnOn).await;
    }

    pub async fn turn_off(&self) {
        self.send(CastCommand::TurnOff).await;
    }

    /// `level` in `0.0..=1.0`.
    pub async fn set_volume_level(&self, level: f64) {
        let output = self.audio_output();
        self.send(CastCommand::SetVolume { level, output }).await;
    }

    pub async fn volume_up(&self) {
        let output = self.audio_output();
        self.send(CastCommand::VolumeUp { output }).await;
    }

    pub async fn volume_down(&self) {
        let output = self.audio_output();
        self.send(CastCommand::VolumeDown { output }).await;
    }

    pub async fn mute_volume(&self, mute: bool) {
        self.send(CastCommand::Mute(mute)).await;
    }

    pub async fn select_source(&self, source: &str) {
        if self.send(CastCommand::SelectSource(source.to_owned())).await {
            self.audio_output.store(Some(Arc::new(source.to_owned())));
        }
    }

    pub async fn media_play(&self) {
        self.send(CastCommand::Play).await;
    }

    pub async fn media_pause(&self) {
        self.send(CastCommand::Pause).await;
    }

    pub async fn media_stop(&self) {
        self.send(CastCommand::Stop).await;
    }

    pub async fn media_next_track(&self) {
        self.send(CastCommand::NextTrack).await;
    }

    pub async fn media_previous_track(&self) {
        self.send(CastCommand::PreviousTrack).await;
    }

    /// Seek to `position` seconds.
    pub async fn media_seek(&self, position: f64) {
        self.send(CastCommand::Seek(position)).await;
    }

    pub async fn play_media(&self, media_type: &str, media_id: &str) {
        let command = CastCommand::PlayMedia {
            session_id: self.bound.session().config().instance_id.clone(),
            media_type: media_type.to_owned(),
            media_id: media_id.to_owned(),
            from_player: true,
        };
        self.send(command).await;
    }

    pub async fn set_repeat(&self, repeat: RepeatMode) {
        self.send(CastCommand::SetRepeat(repeat)).await;
    }

    /// Failures are logged here; returns whether the command went through.
    async fn send(&self, command: CastCommand) -> bool {
        match send_locked(self.bound.session(), &self.cast, command).await {
            Ok(()) => true,
            Err(e) => {
                error!(entity = %self.bound.unique_id(), error = %e, "cast command failed");
                false
            }
        }
    }
}

/// Run one cast command under the cast lock and request a refresh.
pub(crate) async fn send_locked(
    session: &DeviceSession,
    cast: &CastCoordinator,
    command: CastCommand,
) -> Result<(), CoreError> {
    let _guard = cast.lock().await;
    debug!(?command, "cast command");
    session.cast_command(command).await?;
    cast.request_refresh();
    Ok(())
}

impl Entity for CastPlayer {
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
