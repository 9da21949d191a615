//! Shared effect bindings and control arbitration
//!
//! A binding exists per (audio session, effect type) while at least one
//! handle is attached to it. It keeps the live handles in creation order
//! together with the state they share. The handle that was attached last
//! has control; control is derived from the list on every query and never
//! cached, so releasing the controller hands control to the next most
//! recent live handle immediately.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::audiofx::settings::{EffectSettings, EffectType};

/// Audio session an effect is attached to.
pub type SessionId = i32;

/// Session of effects applied to the global output mix.
pub const GLOBAL_SESSION: SessionId = 0;

/// Identity of one effect handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle#{}", self.0)
    }
}

/// Key of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingKey {
    pub session: SessionId,
    pub effect_type: EffectType,
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@session{}", self.effect_type, self.session)
    }
}

#[derive(Debug)]
struct Binding {
    live: Vec<HandleId>,
    enabled: bool,
    settings: EffectSettings,
    effect_id: i32,
}

#[derive(Debug)]
struct RegistryState {
    next_handle: u64,
    next_effect_id: i32,
    bindings: HashMap<BindingKey, Binding>,
}

impl Default for RegistryState {
    fn default() -> Self {
        Self {
            next_handle: 1,
            next_effect_id: 1,
            bindings: HashMap::new(),
        }
    }
}

/// Every binding of one effect environment. Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct EffectRegistry {
    state: Rc<RefCell<RegistryState>>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new handle, creating the binding with default settings if
    /// this is the first live handle. The new handle takes control.
    pub(crate) fn attach(&self, key: BindingKey) -> HandleId {
        let mut s = self.state.borrow_mut();
        let id = HandleId(s.next_handle);
        s.next_handle += 1;

        if !s.bindings.contains_key(&key) {
            let effect_id = s.next_effect_id;
            s.next_effect_id += 1;
            s.bindings.insert(
                key,
                Binding {
                    live: Vec::new(),
                    enabled: false,
                    settings: EffectSettings::default_for(key.effect_type),
                    effect_id,
                },
            );
            debug!("{}: binding created (effect id {})", key, effect_id);
        }
        if let Some(binding) = s.bindings.get_mut(&key) {
            binding.live.push(id);
        }
        debug!("{}: {} attached and has control", key, id);
        id
    }

    /// Detach a handle. The binding goes away with its last handle.
    pub(crate) fn detach(&self, key: BindingKey, id: HandleId) {
        let mut s = self.state.borrow_mut();
        let now_empty = match s.bindings.get_mut(&key) {
            Some(binding) => {
                binding.live.retain(|h| *h != id);
                binding.live.is_empty()
            }
            None => return,
        };
        if now_empty {
            s.bindings.remove(&key);
            debug!("{}: last handle {} released, binding dropped", key, id);
        } else {
            debug!("{}: {} released", key, id);
        }
    }

    /// The handle that currently has control.
    pub fn controller(&self, key: BindingKey) -> Option<HandleId> {
        self.state
            .borrow()
            .bindings
            .get(&key)
            .and_then(|b| b.live.last().copied())
    }

    pub fn has_control(&self, key: BindingKey, id: HandleId) -> bool {
        self.controller(key) == Some(id)
    }

    pub fn is_live(&self, key: BindingKey, id: HandleId) -> bool {
        self.state
            .borrow()
            .bindings
            .get(&key)
            .map(|b| b.live.contains(&id))
            .unwrap_or(false)
    }

    /// Live handles in creation order.
    pub fn live_handles(&self, key: BindingKey) -> Vec<HandleId> {
        self.state
            .borrow()
            .bindings
            .get(&key)
            .map(|b| b.live.clone())
            .unwrap_or_default()
    }

    pub fn enabled(&self, key: BindingKey) -> Option<bool> {
        self.state.borrow().bindings.get(&key).map(|b| b.enabled)
    }

    pub(crate) fn set_enabled(&self, key: BindingKey, enabled: bool) {
        if let Some(binding) = self.state.borrow_mut().bindings.get_mut(&key) {
            binding.enabled = enabled;
        }
    }

    /// A copy of the shared settings.
    pub fn settings(&self, key: BindingKey) -> Option<EffectSettings> {
        self.state
            .borrow()
            .bindings
            .get(&key)
            .map(|b| b.settings.clone())
    }

    pub(crate) fn set_settings(&self, key: BindingKey, settings: EffectSettings) {
        if let Some(binding) = self.state.borrow_mut().bindings.get_mut(&key) {
            binding.settings = settings;
        }
    }

    pub fn effect_id(&self, key: BindingKey) -> Option<i32> {
        self.state.borrow().bindings.get(&key).map(|b| b.effect_id)
    }

    pub fn binding_count(&self) -> usize {
        self.state.borrow().bindings.len()
    }
}
