//! Segue - Gapless Dual-Player Playback with Arbitrated Audio Effects
//!
//! Segue coordinates two media players so that one track hands over to the
//! next without a gap, and mediates access to shared audio effects between
//! competing users.
//!
//! # Architecture
//!
//! - `player`: lifecycle-guarded player over a platform backend
//! - `engine`: two player slots alternating as the active player
//! - `audiofx`: effect handles with last-created-wins control arbitration
//! - `state`: user-facing settings and their snapshots
//! - `app`: the event-driven controller tying it all together

pub mod app;
pub mod audiofx;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod player;
pub mod state;

pub use error::{Result, SegueError};
