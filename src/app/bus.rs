//! Notification bus
//!
//! One-to-many delivery of controller notifications on the controller's own
//! thread. Each subscriber owns a queue; the bus keeps only weak references,
//! so dropping a [`Subscription`] unsubscribes it.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use log::trace;

use crate::app::events::AppEvent;

type Queue = Rc<RefCell<VecDeque<AppEvent>>>;

/// Broadcasts [`AppEvent`]s to every live subscription.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: RefCell<Vec<Weak<RefCell<VecDeque<AppEvent>>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let queue: Queue = Rc::new(RefCell::new(VecDeque::new()));
        self.subscribers.borrow_mut().push(Rc::downgrade(&queue));
        Subscription { queue }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Deliver `event` to every subscriber; returns how many received it.
    pub fn emit(&self, event: AppEvent) -> usize {
        trace!(
            "emit {}/{} ({}, {})",
            event.category,
            event.event,
            event.arg1,
            event.arg2
        );
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|w| w.strong_count() > 0);
        for queue in subscribers.iter().filter_map(Weak::upgrade) {
            queue.borrow_mut().push_back(event.clone());
        }
        subscribers.len()
    }
}

/// Receiving end of an [`EventBus`].
#[derive(Debug)]
pub struct Subscription {
    queue: Queue,
}

impl Subscription {
    pub fn try_recv(&self) -> Option<AppEvent> {
        self.queue.borrow_mut().pop_front()
    }

    /// Everything received since the last drain.
    pub fn drain(&self) -> Vec<AppEvent> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}
