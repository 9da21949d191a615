//! Platform backend seam
//!
//! A [`MediaBackend`] is the platform decoder/renderer a [`BasicPlayer`]
//! drives. Backends emit their callbacks as [`BackendEvent`]s on whatever
//! thread the platform likes; the integration must hand them to the
//! controller's thread before they reach any player (see
//! [`PlayerFactory::poll_events`]).
//!
//! [`BasicPlayer`]: crate::player::BasicPlayer
//! [`PlayerFactory::poll_events`]: crate::player::PlayerFactory::poll_events

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegueError};
use crate::player::events::PlayerEventKind;

/// Identity of one backend instance, unique per platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// Which backend family produced the players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayerImplType {
    /// Stock platform player with stock effects
    #[default]
    Standard,
    /// Native engine-backed player with native effects
    OpenSl,
    /// Native player combined with stock effects where the native engine lacks them
    Hybrid,
}

impl PlayerImplType {
    /// Code used by the `PLAYER_SET_IMPL_TYPE` navigation event.
    pub fn code(self) -> i32 {
        match self {
            PlayerImplType::Standard => 0,
            PlayerImplType::OpenSl => 1,
            PlayerImplType::Hybrid => 2,
        }
    }

    /// Inverse of [`PlayerImplType::code`].
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(PlayerImplType::Standard),
            1 => Ok(PlayerImplType::OpenSl),
            2 => Ok(PlayerImplType::Hybrid),
            other => Err(SegueError::invalid_argument(
                "player_impl_type",
                format!("unknown player implementation type {}", other),
            )),
        }
    }

    /// Whether a player's audio session id can be assigned to another player.
    ///
    /// Backends that cannot share sessions instead share effects between every
    /// player created by the same factory.
    pub fn shares_audio_session(self) -> bool {
        matches!(self, PlayerImplType::Standard)
    }
}

impl fmt::Display for PlayerImplType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerImplType::Standard => write!(f, "standard"),
            PlayerImplType::OpenSl => write!(f, "opensl"),
            PlayerImplType::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// A raw callback from the platform.
///
/// `epoch` is the backend's epoch at emission time; callbacks emitted before a
/// `reset()`/`release()` carry an older epoch and are discarded by the player.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendEvent {
    pub player: PlayerId,
    pub epoch: u32,
    pub kind: PlayerEventKind,
}

/// The platform decoder/renderer behind one player.
///
/// Implementations report failures as [`SegueError::Platform`]; state guards
/// are enforced by [`BasicPlayer`](crate::player::BasicPlayer), not here.
pub trait MediaBackend {
    /// Identity of this backend instance
    fn id(&self) -> PlayerId;

    /// Epoch bumped by every reset/release
    fn epoch(&self) -> u32;

    fn set_data_source(&mut self, uri: &str) -> Result<()>;

    /// Synchronous prepare; the platform still emits a prepared callback.
    fn prepare(&mut self) -> Result<()>;

    /// Non-blocking prepare; completion arrives as a prepared callback.
    fn prepare_async(&mut self) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn reset(&mut self) -> Result<()>;

    fn release(&mut self) -> Result<()>;

    fn seek_to(&mut self, msec: i32) -> Result<()>;

    /// Raw duration in milliseconds; may be stale before prepare completes.
    fn duration(&self) -> i32;

    /// Raw position in milliseconds; may be stale before prepare completes.
    fn current_position(&self) -> i32;

    fn set_volume(&mut self, left: f32, right: f32) -> Result<()>;

    fn set_looping(&mut self, looping: bool) -> Result<()>;

    fn attach_aux_effect(&mut self, effect_id: i32) -> Result<()>;

    fn set_aux_effect_send_level(&mut self, level: f32) -> Result<()>;

    fn audio_session_id(&self) -> i32;

    fn set_audio_session_id(&mut self, session_id: i32) -> Result<()>;

    /// Whether the platform hands playback over to a next player by itself.
    fn supports_native_chaining(&self) -> bool;

    /// Register the next player with the platform. Only called when
    /// [`MediaBackend::supports_native_chaining`] returns true.
    fn set_next(&mut self, next: Option<PlayerId>) -> Result<()>;
}
