//! # Render Gate
//!
//! Idempotency guard for mounts, keyed by `(kind, id)`.
//!
//! Multiple uncoordinated triggers can ask to mount the same entity: the
//! state subscription, a forced re-render, a recovery pass. The gate is the
//! single arbitration point. An entry in `Rendering` blocks every other
//! caller for the duration of the markup fetch; an entry in `Rendered` is
//! re-checked against the live host tree, so stale bookkeeping (marked
//! rendered, node gone) re-grants instead of wedging the entity forever.

use crate::dom::{HostTree, NodeKind};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Entry state. Absent entry = untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Granted to a caller; markup may still be in flight.
    Rendering,

    /// Mount finalized.
    Rendered,
}

/// Mount arbitration table.
#[derive(Debug, Default)]
pub struct RenderGate {
    entries: HashMap<(NodeKind, String), GateState>,
}

impl RenderGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask to mount `(kind, id)`.
    ///
    /// Returns `false` when another caller already holds or finished this
    /// entry — except that a `Rendered` entry with no live node is stale
    /// bookkeeping and re-grants. Granting transitions the entry to
    /// `Rendering`; the caller must finish with [`mark_rendered`]
    /// (or [`clear`] on abort).
    ///
    /// [`mark_rendered`]: RenderGate::mark_rendered
    /// [`clear`]: RenderGate::clear
    pub fn should_render(&mut self, kind: NodeKind, id: &str, tree: &HostTree) -> bool {
        let key = (kind, id.to_string());
        match self.entries.get(&key) {
            Some(GateState::Rendering) => {
                debug!(?kind, id, "render blocked: already in flight");
                false
            }
            Some(GateState::Rendered) => {
                if tree.contains(kind, id) {
                    debug!(?kind, id, "render blocked: already mounted");
                    false
                } else {
                    warn!(?kind, id, "stale render bookkeeping, re-granting");
                    self.entries.insert(key, GateState::Rendering);
                    true
                }
            }
            None => {
                self.entries.insert(key, GateState::Rendering);
                true
            }
        }
    }

    /// Finalize a mount. The reconciler emits the render-complete
    /// notification for the controls layer right after this transition.
    pub fn mark_rendered(&mut self, kind: NodeKind, id: &str) {
        let key = (kind, id.to_string());
        if self.entries.insert(key, GateState::Rendered).is_none() {
            warn!(?kind, id, "mark_rendered without a prior grant");
        }
    }

    /// Forget one entry (unmount or aborted mount) so a later re-add is
    /// treated as fresh.
    pub fn clear(&mut self, kind: NodeKind, id: &str) {
        self.entries.remove(&(kind, id.to_string()));
    }

    /// Current state of an entry, if any.
    pub fn state(&self, kind: NodeKind, id: &str) -> Option<GateState> {
        self.entries.get(&(kind, id.to_string())).copied()
    }

    /// Drop every entry. Full document reload only — never mid-session.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MountedNode;
    use mediakit_state::Placement;

    fn tree_with(id: &str) -> HostTree {
        let mut tree = HostTree::new();
        tree.mount_component(
            MountedNode {
                id: id.to_string(),
                kind: NodeKind::Component,
                component_type: Some("hero".to_string()),
                markup: String::new(),
            },
            &Placement::Root(0),
        );
        tree
    }

    #[test]
    fn test_first_caller_is_granted() {
        let mut gate = RenderGate::new();
        let tree = HostTree::new();
        assert!(gate.should_render(NodeKind::Component, "c1", &tree));
        assert_eq!(gate.state(NodeKind::Component, "c1"), Some(GateState::Rendering));
    }

    #[test]
    fn test_in_flight_entry_blocks_second_caller() {
        let mut gate = RenderGate::new();
        let tree = HostTree::new();
        assert!(gate.should_render(NodeKind::Component, "c1", &tree));
        // Node not yet in the tree; the fetch is still pending. A second
        // trigger must not be granted.
        assert!(!gate.should_render(NodeKind::Component, "c1", &tree));
    }

    #[test]
    fn test_rendered_entry_with_live_node_blocks() {
        let mut gate = RenderGate::new();
        let tree = tree_with("c1");
        assert!(gate.should_render(NodeKind::Component, "c1", &tree));
        gate.mark_rendered(NodeKind::Component, "c1");
        assert!(!gate.should_render(NodeKind::Component, "c1", &tree));
    }

    #[test]
    fn test_stale_rendered_entry_regrants() {
        let mut gate = RenderGate::new();
        let tree = HostTree::new();
        assert!(gate.should_render(NodeKind::Component, "c1", &tree));
        gate.mark_rendered(NodeKind::Component, "c1");

        // Bookkeeping says rendered, but no node exists in the tree.
        assert!(gate.should_render(NodeKind::Component, "c1", &tree));
        assert_eq!(gate.state(NodeKind::Component, "c1"), Some(GateState::Rendering));
    }

    #[test]
    fn test_clear_makes_readd_fresh() {
        let mut gate = RenderGate::new();
        let tree = HostTree::new();
        gate.should_render(NodeKind::Component, "c1", &tree);
        gate.mark_rendered(NodeKind::Component, "c1");
        gate.clear(NodeKind::Component, "c1");

        assert_eq!(gate.state(NodeKind::Component, "c1"), None);
        assert!(gate.should_render(NodeKind::Component, "c1", &tree));
    }

    #[test]
    fn test_component_and_section_keys_are_distinct() {
        let mut gate = RenderGate::new();
        let tree = HostTree::new();
        assert!(gate.should_render(NodeKind::Component, "x", &tree));
        assert!(gate.should_render(NodeKind::Section, "x", &tree));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut gate = RenderGate::new();
        let tree = HostTree::new();
        gate.should_render(NodeKind::Component, "c1", &tree);
        gate.should_render(NodeKind::Section, "s1", &tree);
        gate.reset();
        assert!(gate.is_empty());
    }
}
