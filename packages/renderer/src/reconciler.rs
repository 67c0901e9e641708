//! # Reconciler
//!
//! Subscribes to the store once, turns each `(previous, next)` notification
//! into a [`StateDelta`], and applies the minimal host-tree operations in a
//! fixed order: removals, then additions, then moves, then updates.
//! Removals first avoid id collisions during reordering; additions before
//! moves/updates so those operate on real nodes.
//!
//! Notifications are processed strictly one at a time. A dispatch that
//! lands while an addition is awaiting markup queues behind the current
//! pass, so two passes can never interleave their tree mutations.

use crate::dom::{HostTree, MountedNode, NodeKind};
use crate::gate::RenderGate;
use crate::registry::ComponentRegistry;
use mediakit_state::{diff, ComponentRecord, DocumentState, Placement, SectionRecord, Store};
use std::cell::RefCell;
use std::rc::Rc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What a render-complete notification describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    /// The node was mounted and finalized.
    Mounted,

    /// An existing node's content was re-rendered in place.
    Updated,
}

/// Notification consumed by the controls layer after the reconciler
/// finalizes a mount or patch. Controls attach affordances to the node; they
/// never create or destroy container nodes themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderEvent {
    pub kind: NodeKind,
    pub id: String,
    pub component_type: Option<String>,
    pub phase: RenderPhase,
}

struct StateChange {
    previous: DocumentState,
    next: DocumentState,
}

type EventListener = Box<dyn FnMut(&RenderEvent)>;

/// Store-driven reconciler owning the host tree and the render gate.
pub struct Reconciler {
    registry: Rc<dyn ComponentRegistry>,
    tree: HostTree,
    gate: RenderGate,
    changes: mpsc::UnboundedReceiver<StateChange>,

    /// Most recent state seen by the subscription, consulted after a markup
    /// await to abort mounts for components that vanished mid-fetch.
    latest: Rc<RefCell<DocumentState>>,

    listeners: Vec<EventListener>,
}

impl Reconciler {
    /// Subscribe to the store (exactly once) and build the reconciler.
    pub fn attach(store: &Store, registry: Rc<dyn ComponentRegistry>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let latest = Rc::new(RefCell::new(store.snapshot()));
        let shared = latest.clone();
        store.subscribe(move |previous, next| {
            *shared.borrow_mut() = next.clone();
            // A dropped receiver just means the reconciler is gone.
            let _ = tx.send(StateChange {
                previous: previous.clone(),
                next: next.clone(),
            });
        });

        Self {
            registry,
            tree: HostTree::new(),
            gate: RenderGate::new(),
            changes: rx,
            latest,
            listeners: Vec::new(),
        }
    }

    /// Read access to the mounted tree.
    pub fn tree(&self) -> &HostTree {
        &self.tree
    }

    /// Register a controls-layer callback for render-complete events.
    pub fn on_render_complete(&mut self, listener: impl FnMut(&RenderEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Drain and apply every queued notification, serially, in dispatch
    /// order. Returns the number of passes applied.
    pub async fn flush(&mut self) -> usize {
        let mut passes = 0usize;
        while let Ok(change) = self.changes.try_recv() {
            self.apply(change).await;
            passes += 1;
        }
        passes
    }

    /// Full render pass from the current state, through the same gate as
    /// subscription-driven passes. Safe to call at any time; already
    /// mounted entities are skipped. Returns the number of fresh mounts.
    pub async fn force_render(&mut self) -> usize {
        let state = self.latest.borrow().clone();
        self.tree.set_empty_state(!state.has_content());

        let mut mounted = 0usize;
        for (index, section) in state.sections.iter().enumerate() {
            if self.mount_section(section, index) {
                mounted += 1;
            }
        }
        for (id, placement) in state.render_order() {
            let Some(record) = state.components.get(id.as_str()) else {
                continue;
            };
            if self.mount_component(record.clone(), placement).await {
                mounted += 1;
            }
        }

        self.tree.sync_order(&state);
        self.sweep();
        info!(mounted, "forced render pass complete");
        mounted
    }

    /// Full document reload: drop queued notifications, the tree, and every
    /// gate entry. The caller follows up with a `force_render`.
    pub fn reset(&mut self) {
        while self.changes.try_recv().is_ok() {}
        self.tree.clear();
        self.gate.reset();
        debug!("reconciler reset");
    }

    async fn apply(&mut self, change: StateChange) {
        let StateChange { previous, next } = change;

        // Empty-state visibility is derived from the component count on
        // every notification; it is never cached across passes.
        self.tree.set_empty_state(!next.has_content());

        let delta = diff(&previous, &next);
        if delta.is_empty() {
            return;
        }
        for id in &delta.dangling {
            warn!(component_id = %id, "layout references a component with no record");
        }

        // Removals first. Unmounting is gate-exempt (idempotent), but the
        // gate entry is cleared so a later re-add is fresh.
        for id in &delta.removed {
            self.tree.unmount_component(id.as_str());
            self.gate.clear(NodeKind::Component, id.as_str());
            debug!(component_id = %id, "unmounted");
        }
        for id in &delta.sections_removed {
            self.tree.unmount_section(id.as_str());
            self.gate.clear(NodeKind::Section, id.as_str());
        }

        // New section containers, in document order.
        for (index, section) in next.sections.iter().enumerate() {
            if delta.sections_added.contains(&section.id) {
                self.mount_section(section, index);
            }
        }
        for id in &delta.sections_updated {
            if let Some(section) = next.section(id.as_str()) {
                self.tree.patch_section(id.as_str(), section_markup(section));
            }
        }

        // Additions, in visual order so placement indices land correctly.
        for (id, placement) in next.render_order() {
            if !delta.added.contains(&id) {
                continue;
            }
            let Some(record) = next.components.get(id.as_str()) else {
                continue;
            };
            self.mount_component(record.clone(), placement).await;
        }

        // Moves reposition existing nodes without unmounting them; any live
        // editing state inside a node survives a reorder.
        let layout_changed = !delta.moved.is_empty()
            || !delta.sections_added.is_empty()
            || !delta.sections_removed.is_empty()
            || !delta.sections_updated.is_empty();
        if layout_changed {
            self.tree.sync_order(&next);
        }

        // Updates re-render content in place, one node at a time.
        for id in &delta.updated {
            let Some(record) = next.components.get(id.as_str()) else {
                continue;
            };
            self.update_component(record.clone()).await;
        }

        self.sweep();
    }

    /// Mount one component through the gate. Returns whether a node was
    /// actually mounted.
    async fn mount_component(&mut self, record: ComponentRecord, placement: Placement) -> bool {
        let id = record.id.to_string();
        if !self.gate.should_render(NodeKind::Component, &id, &self.tree) {
            debug!(component_id = %id, "mount skipped: gate denied");
            return false;
        }

        let markup = self.produce_markup(&record).await;

        // The markup fetch may have suspended; a dispatch in the meantime
        // can have removed this component. Never mount a node for an id the
        // latest state no longer contains.
        if !self.latest.borrow().components.contains(&id) {
            debug!(component_id = %id, "component removed while markup was pending, mount aborted");
            self.gate.clear(NodeKind::Component, &id);
            return false;
        }

        let component_type = record.component_type.clone();
        self.tree.mount_component(
            MountedNode {
                id: id.clone(),
                kind: NodeKind::Component,
                component_type: Some(component_type.clone()),
                markup,
            },
            &placement,
        );
        self.gate.mark_rendered(NodeKind::Component, &id);
        self.emit(RenderEvent {
            kind: NodeKind::Component,
            id,
            component_type: Some(component_type),
            phase: RenderPhase::Mounted,
        });
        true
    }

    fn mount_section(&mut self, section: &SectionRecord, index: usize) -> bool {
        let id = section.id.to_string();
        if !self.gate.should_render(NodeKind::Section, &id, &self.tree) {
            return false;
        }
        self.tree.mount_section(
            MountedNode {
                id: id.clone(),
                kind: NodeKind::Section,
                component_type: None,
                markup: section_markup(section),
            },
            section.columns.count(),
            index,
        );
        self.gate.mark_rendered(NodeKind::Section, &id);
        self.emit(RenderEvent {
            kind: NodeKind::Section,
            id,
            component_type: None,
            phase: RenderPhase::Mounted,
        });
        true
    }

    /// Re-render one component's content without touching its siblings. A
    /// node that is unexpectedly missing is mounted fresh through the gate
    /// instead.
    async fn update_component(&mut self, record: ComponentRecord) {
        let id = record.id.to_string();
        if !self.tree.contains(NodeKind::Component, &id) {
            debug!(component_id = %id, "update target not mounted, mounting instead");
            let placement = self
                .latest
                .borrow()
                .placement_of(&id)
                .unwrap_or(Placement::Root(usize::MAX));
            self.mount_component(record, placement).await;
            return;
        }

        let markup = self.produce_markup(&record).await;
        if !self.latest.borrow().components.contains(&id) {
            // Removed while the re-render was pending; the upcoming removal
            // pass unmounts the node, nothing to patch.
            return;
        }
        self.tree.patch_component(&id, markup);
        self.emit(RenderEvent {
            kind: NodeKind::Component,
            id,
            component_type: Some(record.component_type),
            phase: RenderPhase::Updated,
        });
    }

    /// Resolve markup via the registry. A missing or failing renderer
    /// produces a visible fallback placeholder — a missing component must be
    /// obvious, never silently absent.
    async fn produce_markup(&mut self, record: &ComponentRecord) -> String {
        if !self.registry.has_renderer(&record.component_type) {
            warn!(
                component_id = %record.id,
                component_type = %record.component_type,
                "no renderer registered, rendering fallback placeholder"
            );
            return fallback_markup(&record.component_type);
        }
        let registry = self.registry.clone();
        match registry.render(&record.component_type, &record.props).await {
            Ok(markup) => markup,
            Err(error) => {
                warn!(
                    component_id = %record.id,
                    component_type = %record.component_type,
                    %error,
                    "renderer failed, rendering fallback placeholder"
                );
                fallback_markup(&record.component_type)
            }
        }
    }

    /// Post-pass consistency sweep; duplicate placements should be
    /// impossible by construction, so finding any is worth a warning.
    fn sweep(&mut self) {
        let swept = self.tree.remove_duplicates();
        if swept > 0 {
            warn!(swept, "removed duplicate or orphaned order entries");
        }
    }

    fn emit(&mut self, event: RenderEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

/// Placeholder markup for a type with no working renderer.
fn fallback_markup(component_type: &str) -> String {
    format!(
        "<div class=\"mk-component mk-component--fallback\" data-component-type=\"{component_type}\">\
         Unable to render \u{201c}{component_type}\u{201d}</div>"
    )
}

/// Section containers are engine-owned chrome, not registry components.
fn section_markup(section: &SectionRecord) -> String {
    format!(
        "<section class=\"mk-section mk-section--{}-col\" data-section-id=\"{}\"></section>",
        section.columns.count(),
        section.id
    )
}
