//! Player lifecycle states
//!
//! ```text
//! Idle -> Initialized -> (Preparing ->) Prepared -> Started <-> Paused -> PlaybackCompleted
//!                                                       \-> Stopped
//! any -> End (release), any -> Error (platform error callback)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of one player instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayerState {
    /// Freshly created or reset; no data source
    #[default]
    Idle,
    /// Data source set
    Initialized,
    /// Asynchronous prepare in flight
    Preparing,
    /// Ready to start
    Prepared,
    /// Playing
    Started,
    /// Paused by request
    Paused,
    /// Stopped; needs another prepare before starting
    Stopped,
    /// Reached the end of the stream
    PlaybackCompleted,
    /// Released; terminal
    End,
    /// Platform reported an error; only reset/release are meaningful
    Error,
}

impl PlayerState {
    /// Every state in notification-code order.
    pub const ALL: [PlayerState; 10] = [
        PlayerState::Idle,
        PlayerState::Initialized,
        PlayerState::Preparing,
        PlayerState::Prepared,
        PlayerState::Started,
        PlayerState::Paused,
        PlayerState::Stopped,
        PlayerState::PlaybackCompleted,
        PlayerState::End,
        PlayerState::Error,
    ];

    /// Numeric code carried by `PLAYER_STATE_CHANGED` notifications.
    pub fn code(self) -> i32 {
        match self {
            PlayerState::Idle => 0,
            PlayerState::Initialized => 1,
            PlayerState::Preparing => 2,
            PlayerState::Prepared => 3,
            PlayerState::Started => 4,
            PlayerState::Paused => 5,
            PlayerState::Stopped => 6,
            PlayerState::PlaybackCompleted => 7,
            PlayerState::End => 8,
            PlayerState::Error => 9,
        }
    }

    /// Inverse of [`PlayerState::code`].
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.code() == code)
    }

    /// States from which `start()` is accepted.
    pub fn can_start(self) -> bool {
        matches!(
            self,
            PlayerState::Prepared
                | PlayerState::Started
                | PlayerState::Paused
                | PlayerState::PlaybackCompleted
        )
    }

    /// States from which `pause()` is accepted.
    pub fn can_pause(self) -> bool {
        matches!(self, PlayerState::Started | PlayerState::Paused)
    }

    /// States from which `stop()` is accepted.
    pub fn can_stop(self) -> bool {
        matches!(
            self,
            PlayerState::Preparing
                | PlayerState::Prepared
                | PlayerState::Started
                | PlayerState::Paused
                | PlayerState::Stopped
                | PlayerState::PlaybackCompleted
        )
    }

    /// States from which `prepare()`/`prepare_async()` are accepted.
    pub fn can_prepare(self) -> bool {
        matches!(self, PlayerState::Initialized | PlayerState::Stopped)
    }

    /// Whether the prepared transition has completed, i.e. duration and
    /// position reported by the platform are trustworthy.
    pub fn is_prepared(self) -> bool {
        matches!(
            self,
            PlayerState::Prepared
                | PlayerState::Started
                | PlayerState::Paused
                | PlayerState::PlaybackCompleted
        )
    }

    /// States a player may be in to be chained as somebody's next player.
    pub fn can_be_chained(self) -> bool {
        matches!(
            self,
            PlayerState::Prepared | PlayerState::Paused | PlayerState::PlaybackCompleted
        )
    }

    /// States in which `set_next_player()` is rejected on the player itself.
    pub fn rejects_next_player(self) -> bool {
        matches!(self, PlayerState::Idle | PlayerState::End | PlayerState::Error)
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerState::Idle => "Idle",
            PlayerState::Initialized => "Initialized",
            PlayerState::Preparing => "Preparing",
            PlayerState::Prepared => "Prepared",
            PlayerState::Started => "Started",
            PlayerState::Paused => "Paused",
            PlayerState::Stopped => "Stopped",
            PlayerState::PlaybackCompleted => "PlaybackCompleted",
            PlayerState::End => "End",
            PlayerState::Error => "Error",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(PlayerState::default(), PlayerState::Idle);
    }

    #[test]
    fn test_codes_round_trip() {
        for state in PlayerState::ALL {
            assert_eq!(PlayerState::from_code(state.code()), Some(state));
        }
        assert_eq!(PlayerState::from_code(10), None);
        assert_eq!(PlayerState::Error.code(), 9);
    }

    #[test]
    fn test_start_guard() {
        assert!(PlayerState::Prepared.can_start());
        assert!(PlayerState::PlaybackCompleted.can_start());
        assert!(!PlayerState::Initialized.can_start());
        assert!(!PlayerState::Stopped.can_start());
        assert!(!PlayerState::Error.can_start());
    }

    #[test]
    fn test_chaining_guards() {
        assert!(PlayerState::Prepared.can_be_chained());
        assert!(!PlayerState::Started.can_be_chained());
        assert!(PlayerState::Idle.rejects_next_player());
        assert!(!PlayerState::Started.rejects_next_player());
    }
}
