//! # Builder Engine
//!
//! Wires the store, reconciler, id generator and undo history into the
//! public media-kit-builder surface. Mutation calls return once the store
//! has been updated — rendering is applied when the embedding event loop
//! calls [`MediaKitBuilder::flush`].

use crate::lifecycle::ReadySignal;
use mediakit_common::{ComponentId, IdGenerator, SectionId};
use mediakit_renderer::{ComponentRegistry, HostTree, Reconciler, RenderEvent};
use mediakit_state::{
    ComponentRecord, DispatchOutcome, DocumentState, MoveTarget, Mutation, SectionColumns,
    SectionRecord, Store, SubscriptionId, UndoStack,
};
use serde_json::Value;
use std::rc::Rc;
use tracing::info;

/// Drag-and-drop page builder engine for a single media kit document.
///
/// All collaborators receive their dependencies explicitly — there are no
/// ambient globals. Construct once, hand out what each layer needs.
pub struct MediaKitBuilder {
    store: Rc<Store>,
    reconciler: Reconciler,
    ids: IdGenerator,
    history: UndoStack,
    ready: Rc<ReadySignal>,

    /// State as of `begin_batch`, recorded as one undo step on `end_batch`.
    batch_snapshot: Option<DocumentState>,
}

impl MediaKitBuilder {
    /// Create an engine for a document identity (post id, file path — any
    /// stable string; it seeds generated component ids).
    pub fn new(document_identity: &str, registry: Rc<dyn ComponentRegistry>) -> Self {
        let store = Rc::new(Store::default());
        let reconciler = Reconciler::attach(&store, registry);
        Self {
            store,
            reconciler,
            ids: IdGenerator::new(document_identity),
            history: UndoStack::new(),
            ready: Rc::new(ReadySignal::new()),
            batch_snapshot: None,
        }
    }

    /// Hydrate from a saved document (or start empty) and signal readiness
    /// to registered collaborators.
    pub async fn initialize(&mut self, saved: Option<DocumentState>) {
        match saved {
            Some(state) => {
                info!(components = state.components.len(), "hydrating saved document");
                self.load(state).await;
            }
            None => {
                info!("no saved document, starting empty");
                self.reconciler.force_render().await;
            }
        }
        self.ready.mark_ready();
    }

    /// Replace the whole document: reset the render gate and host tree,
    /// then render the incoming state from scratch. The only reset path.
    pub async fn load(&mut self, state: DocumentState) {
        self.history.clear();
        self.store.replace(state);
        self.reconciler.reset();
        self.reconciler.force_render().await;
    }

    // ── Mutation API ────────────────────────────────────────────────────

    /// Add a component; returns its generated id once the store is updated.
    pub fn add_component(
        &mut self,
        component_type: &str,
        props: Value,
        position: Option<usize>,
    ) -> ComponentId {
        let id = self.ids.next_component_id(component_type);
        let record = ComponentRecord::new(id.clone(), component_type, props);
        self.dispatch_recorded(Mutation::AddComponent { record, position });
        id
    }

    pub fn remove_component(&mut self, id: impl Into<ComponentId>) -> DispatchOutcome {
        self.dispatch_recorded(Mutation::RemoveComponent { id: id.into() })
    }

    pub fn update_component(
        &mut self,
        id: impl Into<ComponentId>,
        patch: Value,
    ) -> DispatchOutcome {
        self.dispatch_recorded(Mutation::UpdateComponent {
            id: id.into(),
            patch,
        })
    }

    pub fn move_component(
        &mut self,
        id: impl Into<ComponentId>,
        to: MoveTarget,
    ) -> DispatchOutcome {
        self.dispatch_recorded(Mutation::MoveComponent { id: id.into(), to })
    }

    pub fn set_layout(&mut self, order: Vec<ComponentId>) -> DispatchOutcome {
        self.dispatch_recorded(Mutation::SetLayout { order })
    }

    pub fn update_settings(&mut self, patch: Value) -> DispatchOutcome {
        self.dispatch_recorded(Mutation::UpdateSettings { patch })
    }

    /// Add an empty section; returns its generated id.
    pub fn add_section(&mut self, columns: SectionColumns, position: Option<usize>) -> SectionId {
        let id = self.ids.next_section_id();
        let record = SectionRecord::new(id.clone(), columns);
        self.dispatch_recorded(Mutation::AddSection { record, position });
        id
    }

    pub fn remove_section(&mut self, id: impl Into<SectionId>) -> DispatchOutcome {
        self.dispatch_recorded(Mutation::RemoveSection { id: id.into() })
    }

    pub fn assign_to_section(
        &mut self,
        id: impl Into<ComponentId>,
        section: impl Into<SectionId>,
        column: usize,
    ) -> DispatchOutcome {
        self.dispatch_recorded(Mutation::AssignToSection {
            id: id.into(),
            section: section.into(),
            column,
        })
    }

    fn dispatch_recorded(&mut self, mutation: Mutation) -> DispatchOutcome {
        let description = mutation.describe();
        let before = self.store.snapshot();
        let outcome = self.store.dispatch(mutation);
        if outcome.is_applied() && self.batch_snapshot.is_none() {
            self.history.record(before, Some(description));
        }
        outcome
    }

    // ── Batching ────────────────────────────────────────────────────────

    /// Queue subsequent mutations into one atomic transition (one
    /// notification, one undo step).
    pub fn begin_batch(&mut self) {
        if self.batch_snapshot.is_none() {
            self.batch_snapshot = Some(self.store.snapshot());
        }
        self.store.begin_batch();
    }

    pub fn end_batch(&mut self) -> DispatchOutcome {
        let outcome = self.store.end_batch();
        if let Some(snapshot) = self.batch_snapshot.take() {
            if outcome.is_applied() {
                self.history.record(snapshot, Some("batch".to_string()));
            }
        }
        outcome
    }

    // ── Undo / redo ─────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.store.snapshot()) {
            Some(snapshot) => {
                self.store.replace(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(self.store.snapshot()) {
            Some(snapshot) => {
                self.store.replace(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ── Observation ─────────────────────────────────────────────────────

    /// Store subscription for save-to-server and other state observers.
    pub fn subscribe(
        &self,
        listener: impl FnMut(&DocumentState, &DocumentState) + 'static,
    ) -> SubscriptionId {
        self.store.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.store.unsubscribe(id);
    }

    /// Controls-layer hook: fired per `(kind, id)` once a mount or in-place
    /// update is finalized.
    pub fn on_render_complete(&mut self, listener: impl FnMut(&RenderEvent) + 'static) {
        self.reconciler.on_render_complete(listener);
    }

    /// Run `callback` once the engine has completed initial hydration.
    pub fn on_ready(&self, callback: impl FnOnce() + 'static) {
        self.ready.on_ready(callback);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_ready()
    }

    // ── Rendering ───────────────────────────────────────────────────────

    /// Apply all pending render work. Returns the number of notification
    /// passes applied.
    pub async fn flush(&mut self) -> usize {
        self.reconciler.flush().await
    }

    /// Gate-guarded full render pass from current state; safe to call from
    /// any trigger.
    pub async fn force_render(&mut self) -> usize {
        self.reconciler.force_render().await
    }

    // ── State access ────────────────────────────────────────────────────

    pub fn state(&self) -> DocumentState {
        self.store.snapshot()
    }

    /// Empty-state signal: true iff at least one component exists, derived
    /// from the live state on every call.
    pub fn has_content(&self) -> bool {
        self.store.has_content()
    }

    pub fn version(&self) -> u64 {
        self.store.version()
    }

    /// The mounted host tree (read-only; only the reconciler writes it).
    pub fn tree(&self) -> &HostTree {
        self.reconciler.tree()
    }
}
