//! Player abstraction
//!
//! A uniform playback object over platform backends:
//! - [`BasicPlayer`]: lifecycle guards, defect workarounds, next-player chaining
//! - [`MediaBackend`] / [`PlayerFactory`] / [`MediaPlatform`]: platform seams
//! - [`SimulatedPlatform`]: deterministic in-process platform
//! - [`MetadataSource`]: synchronous track metadata lookup

pub mod backend;
pub mod basic;
pub mod events;
pub mod factory;
pub mod metadata;
pub mod sim;
pub mod state;

pub use backend::{BackendEvent, MediaBackend, PlayerId, PlayerImplType};
pub use basic::{BasicPlayer, ChainHandoff, NextPlayerRef, AUX_SEND_LEVEL_DISABLED};
pub use events::{Listeners, PlayerEventKind};
pub use factory::{MediaPlatform, PlayerFactory};
pub use metadata::{CatalogMetadataSource, MediaMetadata, MetadataSource, WavMetadataSource};
pub use sim::{SimulatedPlatform, SimulatedPlayerFactory};
pub use state::PlayerState;
