//! # Readiness Signals
//!
//! Explicit lifecycle events instead of timer-based readiness polling: a
//! collaborator registers a callback that fires exactly once when the
//! dependency becomes ready. Registering after readiness fires immediately.

use std::cell::{Cell, RefCell};
use tracing::debug;

type ReadyCallback = Box<dyn FnOnce()>;

/// One-shot readiness latch.
#[derive(Default)]
pub struct ReadySignal {
    ready: Cell<bool>,
    callbacks: RefCell<Vec<ReadyCallback>>,
}

impl ReadySignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.get()
    }

    /// Run `callback` once the signal is ready. If it already is, the
    /// callback runs on this call's stack.
    pub fn on_ready(&self, callback: impl FnOnce() + 'static) {
        if self.ready.get() {
            callback();
        } else {
            self.callbacks.borrow_mut().push(Box::new(callback));
        }
    }

    /// Latch the signal and fire pending callbacks in registration order.
    /// Later calls are no-ops.
    pub fn mark_ready(&self) {
        if self.ready.replace(true) {
            return;
        }
        debug!("readiness latched");
        let pending = std::mem::take(&mut *self.callbacks.borrow_mut());
        for callback in pending {
            callback();
        }
    }
}
