//! Playback Engine Module
//!
//! Gapless orchestration of two player slots:
//! - Slot ownership and per-slot state
//! - Active-slot selection and hand-over on completion
//! - Output parameters shared by both slots

pub mod gapless;
pub mod slot;

pub use gapless::{EngineOutput, GaplessEngine};
pub use slot::{GaplessSession, PlaybackOptions, PlayerEvent, PlayerSlot, SlotIndex};
