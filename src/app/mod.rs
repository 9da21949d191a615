//! Application layer
//!
//! - [`AppEvent`] / [`AppCommand`]: the request and notification envelope
//! - [`EventBus`]: notification delivery to UI subscribers
//! - [`AppController`]: stores, engine and effects behind one event loop

pub mod bus;
pub mod controller;
pub mod events;

pub use bus::{EventBus, Subscription};
pub use controller::{AppController, Foreground};
pub use events::{
    category, effect, effect_category, extra, hq_visualizer, navigation, player, visualizer,
    AppCommand, AppEvent,
};
