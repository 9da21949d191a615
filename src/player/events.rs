//! Player callbacks as tagged variants

use serde::{Deserialize, Serialize};

/// One lifecycle callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerEventKind {
    Prepared,
    Completion,
    Error { what: i32, extra: i32 },
    Info { what: i32, extra: i32 },
    SeekComplete,
    BufferingUpdate { percent: i32 },
}

impl PlayerEventKind {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEventKind::Prepared => "prepared",
            PlayerEventKind::Completion => "completion",
            PlayerEventKind::Error { .. } => "error",
            PlayerEventKind::Info { .. } => "info",
            PlayerEventKind::SeekComplete => "seek-complete",
            PlayerEventKind::BufferingUpdate { .. } => "buffering-update",
        }
    }
}

/// Error `what` code for an unspecified platform error.
pub const MEDIA_ERROR_UNKNOWN: i32 = 1;
/// Error `what` code for a dead media server.
pub const MEDIA_ERROR_SERVER_DIED: i32 = 100;
/// Error `extra` code for an I/O failure.
pub const MEDIA_ERROR_IO: i32 = -1004;
/// Info `what` code emitted when a chained player takes over.
pub const MEDIA_INFO_STARTED_AS_NEXT: i32 = 2;

/// Callback set registered on a player.
///
/// Each slot holds at most one listener; registering again replaces the
/// previous listener. `clear()` drops every listener.
#[derive(Default)]
pub struct Listeners {
    pub(crate) on_prepared: Option<Box<dyn FnMut()>>,
    pub(crate) on_completion: Option<Box<dyn FnMut()>>,
    pub(crate) on_error: Option<Box<dyn FnMut(i32, i32)>>,
    pub(crate) on_info: Option<Box<dyn FnMut(i32, i32)>>,
    pub(crate) on_seek_complete: Option<Box<dyn FnMut()>>,
    pub(crate) on_buffering_update: Option<Box<dyn FnMut(i32)>>,
}

impl Listeners {
    pub fn clear(&mut self) {
        *self = Listeners::default();
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        [
            self.on_prepared.is_some(),
            self.on_completion.is_some(),
            self.on_error.is_some(),
            self.on_info.is_some(),
            self.on_seek_complete.is_some(),
            self.on_buffering_update.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke the listener matching `kind`, if one is registered.
    pub(crate) fn fire(&mut self, kind: &PlayerEventKind) {
        match *kind {
            PlayerEventKind::Prepared => {
                if let Some(cb) = self.on_prepared.as_mut() {
                    cb();
                }
            }
            PlayerEventKind::Completion => {
                if let Some(cb) = self.on_completion.as_mut() {
                    cb();
                }
            }
            PlayerEventKind::Error { what, extra } => {
                if let Some(cb) = self.on_error.as_mut() {
                    cb(what, extra);
                }
            }
            PlayerEventKind::Info { what, extra } => {
                if let Some(cb) = self.on_info.as_mut() {
                    cb(what, extra);
                }
            }
            PlayerEventKind::SeekComplete => {
                if let Some(cb) = self.on_seek_complete.as_mut() {
                    cb();
                }
            }
            PlayerEventKind::BufferingUpdate { percent } => {
                if let Some(cb) = self.on_buffering_update.as_mut() {
                    cb(percent);
                }
            }
        }
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners").field("registered", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_fire_matches_kind() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::default();

        let s = Rc::clone(&seen);
        listeners.on_error = Some(Box::new(move |what, extra| {
            s.borrow_mut().push((what, extra));
        }));

        listeners.fire(&PlayerEventKind::Prepared);
        listeners.fire(&PlayerEventKind::Error { what: 1, extra: -1004 });

        assert_eq!(*seen.borrow(), vec![(1, -1004)]);
    }

    #[test]
    fn test_clear_drops_all() {
        let mut listeners = Listeners::default();
        listeners.on_prepared = Some(Box::new(|| {}));
        listeners.on_completion = Some(Box::new(|| {}));
        assert_eq!(listeners.len(), 2);

        listeners.clear();
        assert!(listeners.is_empty());
    }
}
