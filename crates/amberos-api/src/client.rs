// ── Vendor client contract ──
//
// Every method is a synchronous, blocking call against the device.
// Callers on an async runtime must dispatch these to a blocking pool.

use crate::capability::Capability;
use crate::error::Error;
use crate::models::CapabilityData;
use crate::transport::ConnectionParams;

/// One authenticated session to an AmberOS device.
///
/// Implementations surface an expired session as [`Error::LoginInvalid`]
/// from any call; the orchestration layer treats that as the signal to
/// rebuild the session.
pub trait DeviceClient: Send + Sync + 'static {
    /// Authenticate and open the session.
    fn login(&self) -> Result<(), Error>;

    /// Close the session.
    fn logout(&self) -> Result<(), Error>;

    /// Perform one fetch of a capability group and return its typed state.
    fn update(&self, capability: Capability) -> Result<CapabilityData, Error>;

    /// Release whatever the client keeps for a capability group.
    fn reset(&self, capability: Capability);

    fn reboot(&self) -> Result<(), Error>;

    fn shutdown(&self, reason: Option<&str>) -> Result<(), Error>;

    /// Issue a command against the cast (media playback) group.
    fn cast(&self, command: &CastCommand) -> Result<(), Error>;
}

/// Builds a fresh, not-yet-authenticated client for one setup attempt.
pub trait ClientFactory: Send + Sync + 'static {
    fn create(&self, params: &ConnectionParams) -> Result<Box<dyn DeviceClient>, Error>;
}

impl<F> ClientFactory for F
where
    F: Fn(&ConnectionParams) -> Result<Box<dyn DeviceClient>, Error> + Send + Sync + 'static,
{
    fn create(&self, params: &ConnectionParams) -> Result<Box<dyn DeviceClient>, Error> {
        self(params)
    }
}

/// Repeat mode for cast playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}

impl RepeatMode {
    /// Numeric play mode understood by the device.
    pub fn play_mode(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::One => 1,
            Self::All => 2,
        }
    }
}

/// All commands accepted by the cast group.
#[derive(Debug, Clone, PartialEq)]
pub enum CastCommand {
    TurnOn,
    TurnOff,
    /// Volume in `0.0..=1.0` on the given audio output.
    SetVolume {
        level: f64,
        output: Option<String>,
    },
    VolumeUp {
        output: Option<String>,
    },
    VolumeDown {
        output: Option<String>,
    },
    Mute(bool),
    SelectSource(String),
    Play,
    Pause,
    Stop,
    NextTrack,
    PreviousTrack,
    /// Seek to an absolute position in seconds.
    Seek(f64),
    PlayMedia {
        /// Identifies the calling hub instance to the device.
        session_id: String,
        media_type: String,
        media_id: String,
        /// `true` when issued from the media player, `false` for the
        /// path-based play service.
        from_player: bool,
    },
    SetRepeat(RepeatMode),
}
