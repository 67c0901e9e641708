//! # State Store
//!
//! One-writer/many-reader store over [`DocumentState`].
//!
//! Each dispatch computes the full next state, swaps it in atomically, then
//! notifies listeners synchronously and in subscription order with
//! `(previous, next)` snapshots. A dispatch issued from inside a listener is
//! queued and applied after the current notification cycle completes, so a
//! cycle never observes a half-applied state.
//!
//! The model is single-threaded and cooperative: the store is not `Sync`,
//! and listeners run on the caller's stack.

use crate::document::DocumentState;
use crate::mutations::{Mutation, MutationError};
use std::cell::RefCell;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Handle for removing a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Outcome of a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The mutation was applied; listeners were notified.
    Applied { version: u64 },

    /// The mutation referenced something that does not exist (or would
    /// create a duplicate) and was dropped with a warning. The builder
    /// stays usable; the state is untouched.
    Ignored(MutationError),

    /// Deferred: either a batch is open, or the dispatch arrived from
    /// inside a listener and will run after the current cycle.
    Queued,

    /// Nothing happened: empty batch, or an unbalanced `end_batch`.
    Empty,
}

impl DispatchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, DispatchOutcome::Applied { .. })
    }
}

type Listener = Box<dyn FnMut(&DocumentState, &DocumentState)>;

struct ListenerEntry {
    id: SubscriptionId,
    callback: Listener,
}

struct Inner {
    state: DocumentState,
    version: u64,
    listeners: Vec<ListenerEntry>,
    next_listener_id: u64,
    notifying: bool,
    reentrant: VecDeque<Mutation>,
    unsubscribed: Vec<SubscriptionId>,
    batching: bool,
    batch: Vec<Mutation>,
}

/// Canonical state store.
pub struct Store {
    inner: RefCell<Inner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(DocumentState::default())
    }
}

impl Store {
    pub fn new(initial: DocumentState) -> Self {
        Self {
            inner: RefCell::new(Inner {
                state: initial,
                version: 0,
                listeners: Vec::new(),
                next_listener_id: 0,
                notifying: false,
                reentrant: VecDeque::new(),
                unsubscribed: Vec::new(),
                batching: false,
                batch: Vec::new(),
            }),
        }
    }

    /// Clone of the current state. Callers get their own copy; there is no
    /// way to mutate the store's state in place from outside.
    pub fn snapshot(&self) -> DocumentState {
        self.inner.borrow().state.clone()
    }

    /// Read the current state without cloning.
    pub fn with_state<R>(&self, f: impl FnOnce(&DocumentState) -> R) -> R {
        f(&self.inner.borrow().state)
    }

    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Derived content signal for UI collaborators.
    pub fn has_content(&self) -> bool {
        self.inner.borrow().state.has_content()
    }

    /// Register a listener called with `(previous, next)` once per applied
    /// dispatch, synchronously, in subscription order.
    pub fn subscribe(
        &self,
        listener: impl FnMut(&DocumentState, &DocumentState) + 'static,
    ) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        inner.next_listener_id += 1;
        let id = SubscriptionId(inner.next_listener_id);
        inner.listeners.push(ListenerEntry {
            id,
            callback: Box::new(listener),
        });
        id
    }

    /// Remove a listener. Safe to call from inside a notification; the
    /// removal takes effect once the current cycle completes.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut inner = self.inner.borrow_mut();
        if inner.notifying {
            inner.unsubscribed.push(id);
        } else {
            inner.listeners.retain(|entry| entry.id != id);
        }
    }

    /// Apply a mutation.
    ///
    /// Unknown-reference and duplicate-id failures are downgraded to a
    /// structured warning and a no-op; the builder must remain usable when
    /// a stale id surfaces.
    pub fn dispatch(&self, mutation: Mutation) -> DispatchOutcome {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.batching {
                inner.batch.push(mutation);
                return DispatchOutcome::Queued;
            }
            if inner.notifying {
                inner.reentrant.push_back(mutation);
                return DispatchOutcome::Queued;
            }
        }
        self.apply_now(mutation)
    }

    fn apply_now(&self, mutation: Mutation) -> DispatchOutcome {
        let (previous, next, version) = {
            let mut inner = self.inner.borrow_mut();
            let mut next = inner.state.clone();
            if let Err(error) = mutation.apply(&mut next) {
                warn!(mutation = %mutation.describe(), %error, "mutation ignored");
                return DispatchOutcome::Ignored(error);
            }
            let previous = std::mem::replace(&mut inner.state, next.clone());
            inner.version += 1;
            debug!(mutation = %mutation.describe(), version = inner.version, "mutation applied");
            (previous, next, inner.version)
        };

        self.notify(&previous, &next);
        self.drain_reentrant();
        DispatchOutcome::Applied { version }
    }

    /// Open a batch: subsequent dispatches queue and apply together in
    /// `end_batch` as one atomic transition with a single notification.
    pub fn begin_batch(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.batching {
            warn!("begin_batch while a batch is already open");
            return;
        }
        inner.batching = true;
    }

    /// Close the batch and apply its queued mutations. Mutations that fail
    /// validation are warned and skipped; the rest apply. Listeners see one
    /// `(previous, next)` pair covering the whole batch.
    pub fn end_batch(&self) -> DispatchOutcome {
        let (previous, next, version) = {
            let mut inner = self.inner.borrow_mut();
            if !inner.batching {
                warn!("end_batch without begin_batch");
                return DispatchOutcome::Empty;
            }
            inner.batching = false;
            let queued = std::mem::take(&mut inner.batch);

            let mut next = inner.state.clone();
            let mut applied = 0usize;
            for mutation in queued {
                match mutation.apply(&mut next) {
                    Ok(()) => applied += 1,
                    Err(error) => {
                        warn!(mutation = %mutation.describe(), %error, "batched mutation skipped");
                    }
                }
            }
            if applied == 0 {
                return DispatchOutcome::Empty;
            }
            let previous = std::mem::replace(&mut inner.state, next.clone());
            inner.version += 1;
            debug!(mutations = applied, version = inner.version, "batch applied");
            (previous, next, inner.version)
        };

        self.notify(&previous, &next);
        self.drain_reentrant();
        DispatchOutcome::Applied { version }
    }

    /// Replace the whole document (load path, undo/redo). The incoming
    /// state is normalized first; structural damage is repaired, not fatal.
    pub fn replace(&self, mut state: DocumentState) -> u64 {
        let report = state.normalize();
        if !report.is_clean() {
            warn!(
                dropped_refs = report.dropped_refs.len(),
                dropped_components = report.dropped_components.len(),
                deduped = report.deduped_placements,
                "replacement state required normalization"
            );
        }

        let (previous, next, version) = {
            let mut inner = self.inner.borrow_mut();
            let previous = std::mem::replace(&mut inner.state, state.clone());
            inner.version += 1;
            (previous, state, inner.version)
        };

        self.notify(&previous, &next);
        self.drain_reentrant();
        version
    }

    /// Run one notification cycle. Listener vectors are moved out of the
    /// cell while callbacks run so a listener may subscribe, unsubscribe, or
    /// dispatch (queued) without re-entering the store.
    fn notify(&self, previous: &DocumentState, next: &DocumentState) {
        let mut current = {
            let mut inner = self.inner.borrow_mut();
            inner.notifying = true;
            std::mem::take(&mut inner.listeners)
        };

        for entry in &mut current {
            (entry.callback)(previous, next);
        }

        let mut inner = self.inner.borrow_mut();
        // Listeners registered during the cycle landed in the (empty) live
        // vector; append them after the original subscribers.
        let added = std::mem::take(&mut inner.listeners);
        current.extend(added);
        let removed = std::mem::take(&mut inner.unsubscribed);
        if !removed.is_empty() {
            current.retain(|entry| !removed.contains(&entry.id));
        }
        inner.listeners = current;
        inner.notifying = false;
    }

    /// Apply dispatches queued by listeners during notification, in FIFO
    /// order. Each application runs its own full notification cycle.
    fn drain_reentrant(&self) {
        loop {
            let queued = {
                let mut inner = self.inner.borrow_mut();
                if inner.notifying {
                    return;
                }
                inner.reentrant.pop_front()
            };
            match queued {
                Some(mutation) => {
                    let _ = self.apply_now(mutation);
                }
                None => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ComponentRecord;
    use mediakit_common::ComponentId;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn add(id: &str) -> Mutation {
        Mutation::AddComponent {
            record: ComponentRecord::new(ComponentId::from(id), "hero", json!({})),
            position: None,
        }
    }

    #[test]
    fn test_dispatch_applies_and_bumps_version() {
        let store = Store::default();
        let outcome = store.dispatch(add("c1"));
        assert!(outcome.is_applied());
        assert_eq!(store.version(), 1);
        assert!(store.has_content());
    }

    #[test]
    fn test_unknown_id_is_warned_no_op() {
        let store = Store::default();
        let outcome = store.dispatch(Mutation::RemoveComponent {
            id: ComponentId::from("does-not-exist"),
        });

        assert!(matches!(outcome, DispatchOutcome::Ignored(_)));
        assert_eq!(store.version(), 0);
        assert_eq!(store.snapshot().components.len(), 0);
    }

    #[test]
    fn test_listeners_receive_previous_and_next_in_order() {
        let store = Store::default();
        let calls: Rc<RefCell<Vec<(usize, usize, u32)>>> = Rc::new(RefCell::new(Vec::new()));

        for tag in 0..3u32 {
            let calls = calls.clone();
            store.subscribe(move |previous, next| {
                calls
                    .borrow_mut()
                    .push((previous.components.len(), next.components.len(), tag));
            });
        }

        store.dispatch(add("c1"));
        assert_eq!(
            calls.borrow().as_slice(),
            &[(0, 1, 0), (0, 1, 1), (0, 1, 2)]
        );
    }

    #[test]
    fn test_reentrant_dispatch_is_queued_not_nested() {
        let store = Rc::new(Store::default());
        let depth = Rc::new(RefCell::new(0usize));
        let max_next_len = Rc::new(RefCell::new(Vec::new()));

        {
            let inner_store = store.clone();
            let depth = depth.clone();
            let seen = max_next_len.clone();
            store.subscribe(move |_, next| {
                let store = &inner_store;
                *depth.borrow_mut() += 1;
                assert_eq!(*depth.borrow(), 1, "notification cycles must not nest");
                seen.borrow_mut().push(next.components.len());
                if next.components.len() == 1 {
                    // Must be queued, not applied re-entrantly.
                    let outcome = store.dispatch(add("c2"));
                    assert_eq!(outcome, DispatchOutcome::Queued);
                }
                *depth.borrow_mut() -= 1;
            });
        }

        store.dispatch(add("c1"));
        // Two separate cycles: one for c1, one for the queued c2.
        assert_eq!(max_next_len.borrow().as_slice(), &[1, 2]);
        assert_eq!(store.snapshot().components.len(), 2);
    }

    #[test]
    fn test_batch_applies_once_with_single_notification() {
        let store = Store::default();
        let notifications = Rc::new(RefCell::new(0usize));
        {
            let notifications = notifications.clone();
            store.subscribe(move |_, _| {
                *notifications.borrow_mut() += 1;
            });
        }

        store.begin_batch();
        assert_eq!(store.dispatch(add("c1")), DispatchOutcome::Queued);
        assert_eq!(store.dispatch(add("c2")), DispatchOutcome::Queued);
        assert_eq!(*notifications.borrow(), 0);

        let outcome = store.end_batch();
        assert!(outcome.is_applied());
        assert_eq!(*notifications.borrow(), 1);
        assert_eq!(store.snapshot().components.len(), 2);
    }

    #[test]
    fn test_batch_skips_failing_mutations() {
        let store = Store::default();
        store.begin_batch();
        store.dispatch(add("c1"));
        store.dispatch(Mutation::RemoveComponent {
            id: ComponentId::from("ghost"),
        });
        store.end_batch();

        assert_eq!(store.snapshot().components.len(), 1);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let store = Store::default();
        let count = Rc::new(RefCell::new(0usize));
        let id = {
            let count = count.clone();
            store.subscribe(move |_, _| {
                *count.borrow_mut() += 1;
            })
        };

        store.dispatch(add("c1"));
        store.unsubscribe(id);
        store.dispatch(add("c2"));
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_replace_normalizes_incoming_state() {
        let store = Store::default();
        let mut incoming = DocumentState::default();
        incoming.layout.push(ComponentId::from("ghost"));
        store.replace(incoming);

        assert!(store.snapshot().layout.is_empty());
    }

    #[test]
    fn test_snapshot_is_detached_from_the_store() {
        let store = Store::default();
        store.dispatch(add("c1"));

        let mut snapshot = store.snapshot();
        snapshot.layout.clear();
        assert_eq!(store.snapshot().layout.len(), 1);
    }
}
