//! Player slots and the gapless session aggregate

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegueError};
use crate::player::{BasicPlayer, MediaMetadata, PlayerEventKind, PlayerState};

/// One of the two ownership slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SlotIndex {
    #[default]
    Zero,
    One,
}

impl SlotIndex {
    pub const BOTH: [SlotIndex; 2] = [SlotIndex::Zero, SlotIndex::One];

    pub fn index(self) -> usize {
        match self {
            SlotIndex::Zero => 0,
            SlotIndex::One => 1,
        }
    }

    pub fn other(self) -> SlotIndex {
        match self {
            SlotIndex::Zero => SlotIndex::One,
            SlotIndex::One => SlotIndex::Zero,
        }
    }

    /// Parse a slot number carried in an event argument.
    pub fn from_arg(value: i32) -> Result<SlotIndex> {
        match value {
            0 => Ok(SlotIndex::Zero),
            1 => Ok(SlotIndex::One),
            other => Err(SegueError::invalid_argument(
                "slot",
                format!("slot index must be 0 or 1, got {}", other),
            )),
        }
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot{}", self.index())
    }
}

/// A callback routed to a slot, stamped with the slot generation that was
/// current when the listener was registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerEvent {
    pub slot: SlotIndex,
    pub generation: u32,
    pub kind: PlayerEventKind,
}

/// Ownership slot for one player.
#[derive(Debug)]
pub struct PlayerSlot {
    pub(crate) player: Option<BasicPlayer>,
    pub(crate) state: PlayerState,
    pub(crate) media_uri: Option<String>,
    pub(crate) metadata: Option<MediaMetadata>,
    pub(crate) chained_next: Option<SlotIndex>,
    pub(crate) generation: u32,
}

impl Default for PlayerSlot {
    fn default() -> Self {
        Self {
            player: None,
            state: PlayerState::End,
            media_uri: None,
            metadata: None,
            chained_next: None,
            generation: 0,
        }
    }
}

impl PlayerSlot {
    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn player(&self) -> Option<&BasicPlayer> {
        self.player.as_ref()
    }

    pub fn has_player(&self) -> bool {
        self.player.is_some()
    }

    pub fn media_uri(&self) -> Option<&str> {
        self.media_uri.as_deref()
    }

    pub fn metadata(&self) -> Option<&MediaMetadata> {
        self.metadata.as_ref()
    }

    /// The slot whose player this slot hands over to on completion.
    pub fn chained_next(&self) -> Option<SlotIndex> {
        self.chained_next
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Invalidate every callback registered so far.
    pub(crate) fn bump_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Gapless control variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GaplessSession {
    pub active: SlotIndex,
    /// Both slots prepared and mutually chained
    pub next_player_prepared: bool,
    /// Natural completion happened while the active slot was not Started
    pub swap_pending: bool,
}

impl GaplessSession {
    pub fn reset(&mut self) {
        *self = GaplessSession::default();
    }
}

/// Output parameters applied to both slots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackOptions {
    pub looping: bool,
    pub volume_left: f32,
    pub volume_right: f32,
    pub aux_send_level: f32,
    /// Attached auxiliary effect id; 0 means none
    pub aux_effect_id: i32,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            looping: false,
            volume_left: 1.0,
            volume_right: 1.0,
            aux_send_level: 1.0,
            aux_effect_id: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_index_other() {
        assert_eq!(SlotIndex::Zero.other(), SlotIndex::One);
        assert_eq!(SlotIndex::One.other(), SlotIndex::Zero);
        assert_eq!(SlotIndex::One.index(), 1);
    }

    #[test]
    fn test_slot_index_from_arg() {
        assert_eq!(SlotIndex::from_arg(1).unwrap(), SlotIndex::One);
        assert!(SlotIndex::from_arg(2).is_err());
        assert!(SlotIndex::from_arg(-1).is_err());
    }

    #[test]
    fn test_new_slot_is_released() {
        let slot = PlayerSlot::default();
        assert_eq!(slot.state(), PlayerState::End);
        assert!(!slot.has_player());
    }

    #[test]
    fn test_session_reset() {
        let mut session = GaplessSession {
            active: SlotIndex::One,
            next_player_prepared: true,
            swap_pending: true,
        };
        session.reset();
        assert_eq!(session, GaplessSession::default());
        assert_eq!(session.active, SlotIndex::Zero);
    }
}
