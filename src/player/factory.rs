//! Player factory seams

use crate::error::Result;
use crate::player::backend::{BackendEvent, PlayerImplType};
use crate::player::basic::BasicPlayer;

/// Creates players of one implementation type and marshals their callbacks.
///
/// Every player created by one factory shares that factory's effect
/// environment, which is how backends without session sharing still apply
/// the same effects to both gapless slots.
pub trait PlayerFactory {
    fn impl_type(&self) -> PlayerImplType;

    fn create_player(&mut self) -> Result<BasicPlayer>;

    /// Callbacks queued by the platform since the last poll, in emission order.
    fn poll_events(&mut self) -> Vec<BackendEvent>;
}

/// Entry point to a playback platform.
pub trait MediaPlatform {
    fn create_factory(&self, impl_type: PlayerImplType) -> Result<Box<dyn PlayerFactory>>;
}
