//! # Host Tree
//!
//! The renderer-owned tree of mounted nodes — the engine's stand-in for the
//! DOM subtree it controls. Only the reconciler writes to it; collaborators
//! read node markup and order after render-complete notifications.

use mediakit_common::{ComponentId, SectionId};
use mediakit_state::{DocumentState, Placement};
use std::collections::HashMap;
use tracing::warn;

/// Which kind of entity a node (or render-gate entry) refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Component,
    Section,
}

/// A mounted node and its opaque markup payload.
#[derive(Debug, Clone, PartialEq)]
pub struct MountedNode {
    pub id: String,
    pub kind: NodeKind,

    /// Component type for component nodes; `None` for sections.
    pub component_type: Option<String>,

    pub markup: String,
}

/// Ordered container of mounted nodes.
///
/// Top-level visual order is root components first, then sections; inside a
/// section, columns in order, each column an ordered slot list. This mirrors
/// [`DocumentState::render_order`].
#[derive(Debug, Default)]
pub struct HostTree {
    component_nodes: HashMap<ComponentId, MountedNode>,
    section_nodes: HashMap<SectionId, MountedNode>,

    root_order: Vec<ComponentId>,
    section_order: Vec<SectionId>,
    section_children: HashMap<SectionId, Vec<Vec<ComponentId>>>,

    /// Whether the single empty-state placeholder is currently shown.
    empty_state_visible: bool,
}

impl HostTree {
    pub fn new() -> Self {
        Self {
            empty_state_visible: true,
            ..Self::default()
        }
    }

    /// Number of mounted component nodes.
    pub fn component_count(&self) -> usize {
        self.component_nodes.len()
    }

    pub fn section_count(&self) -> usize {
        self.section_nodes.len()
    }

    /// Ground truth for the render gate: is a node of this kind and id
    /// actually present?
    pub fn contains(&self, kind: NodeKind, id: &str) -> bool {
        match kind {
            NodeKind::Component => self.component_nodes.contains_key(id),
            NodeKind::Section => self.section_nodes.contains_key(id),
        }
    }

    pub fn component_node(&self, id: &str) -> Option<&MountedNode> {
        self.component_nodes.get(id)
    }

    pub fn section_node(&self, id: &str) -> Option<&MountedNode> {
        self.section_nodes.get(id)
    }

    /// Mount a component node at a placement. An unknown target section
    /// degrades to a root append with a warning rather than dropping the
    /// node.
    pub fn mount_component(&mut self, node: MountedNode, placement: &Placement) {
        let id = ComponentId::from(node.id.clone());
        self.component_nodes.insert(id.clone(), node);
        self.insert_ordered(id, placement);
    }

    fn insert_ordered(&mut self, id: ComponentId, placement: &Placement) {
        match placement {
            Placement::Root(index) => {
                let index = (*index).min(self.root_order.len());
                self.root_order.insert(index, id);
            }
            Placement::InSection {
                section,
                column,
                index,
            } => match self.section_children.get_mut(section) {
                Some(columns) if *column < columns.len() => {
                    let slot = &mut columns[*column];
                    let index = (*index).min(slot.len());
                    slot.insert(index, id);
                }
                _ => {
                    warn!(component_id = %id, section = %section, "mount target section missing, appending to root");
                    self.root_order.push(id);
                }
            },
        }
    }

    /// Unmount a component node. Removing an absent node is a no-op.
    pub fn unmount_component(&mut self, id: &str) -> bool {
        let existed = self.component_nodes.remove(id).is_some();
        self.detach_component_order(id);
        existed
    }

    fn detach_component_order(&mut self, id: &str) {
        self.root_order.retain(|c| c.as_str() != id);
        for columns in self.section_children.values_mut() {
            for slot in columns {
                slot.retain(|c| c.as_str() != id);
            }
        }
    }

    /// Mount a section container with empty column slots.
    pub fn mount_section(&mut self, node: MountedNode, columns: usize, index: usize) {
        let id = SectionId::from(node.id.clone());
        self.section_nodes.insert(id.clone(), node);
        self.section_children
            .insert(id.clone(), vec![Vec::new(); columns]);
        let index = index.min(self.section_order.len());
        self.section_order.insert(index, id);
    }

    /// Unmount a section container. Its children stay mounted and fall back
    /// to the end of the root order; the following reorder pass puts them
    /// where the next state wants them.
    pub fn unmount_section(&mut self, id: &str) -> Vec<ComponentId> {
        let existed = self.section_nodes.remove(id).is_some();
        self.section_order.retain(|s| s.as_str() != id);
        let orphans: Vec<ComponentId> = self
            .section_children
            .remove(id)
            .map(|columns| columns.into_iter().flatten().collect())
            .unwrap_or_default();
        if existed {
            self.root_order.extend(orphans.iter().cloned());
        }
        orphans
    }

    /// Replace a mounted component's markup in place. The node itself is
    /// not recreated, so any live state attached to it survives.
    pub fn patch_component(&mut self, id: &str, markup: String) -> bool {
        match self.component_nodes.get_mut(id) {
            Some(node) => {
                node.markup = markup;
                true
            }
            None => false,
        }
    }

    pub fn patch_section(&mut self, id: &str, markup: String) -> bool {
        match self.section_nodes.get_mut(id) {
            Some(node) => {
                node.markup = markup;
                true
            }
            None => false,
        }
    }

    /// Realign node order with the given state without unmounting anything.
    ///
    /// Nodes the state does not place (e.g. a mount still awaiting markup)
    /// keep out of the way; they are inserted at their own placement when
    /// they finish.
    pub fn sync_order(&mut self, state: &DocumentState) {
        let mut root: Vec<ComponentId> = Vec::new();
        let mut children: HashMap<SectionId, Vec<Vec<ComponentId>>> = HashMap::new();
        let mut sections: Vec<SectionId> = Vec::new();

        for section in &state.sections {
            if self.section_nodes.contains_key(section.id.as_str()) {
                sections.push(section.id.clone());
                children.insert(
                    section.id.clone(),
                    vec![Vec::new(); section.columns.count()],
                );
            }
        }

        for (id, placement) in state.render_order() {
            if !self.component_nodes.contains_key(id.as_str()) {
                continue;
            }
            match placement {
                Placement::Root(_) => root.push(id),
                Placement::InSection {
                    section, column, ..
                } => match children.get_mut(&section) {
                    Some(columns) if column < columns.len() => columns[column].push(id),
                    _ => root.push(id),
                },
            }
        }

        // Mounted components the state no longer places would otherwise
        // vanish from the order lists; keep them at the end of the root
        // until their unmount (or re-placement) is processed.
        for id in self.component_nodes.keys() {
            let placed_in_root = root.contains(id);
            let placed_in_section = children
                .values()
                .any(|columns| columns.iter().any(|slot| slot.contains(id)));
            if !placed_in_root && !placed_in_section {
                root.push(id.clone());
            }
        }

        self.root_order = root;
        self.section_order = sections;
        self.section_children = children;
    }

    /// Visual component order: root first, then sections/columns in order.
    pub fn component_order(&self) -> Vec<ComponentId> {
        let mut out = self.root_order.clone();
        for section in &self.section_order {
            if let Some(columns) = self.section_children.get(section) {
                for slot in columns {
                    out.extend(slot.iter().cloned());
                }
            }
        }
        out
    }

    pub fn section_ids(&self) -> &[SectionId] {
        &self.section_order
    }

    /// Component ids mounted inside one section, columns flattened.
    pub fn section_components(&self, id: &str) -> Vec<ComponentId> {
        self.section_children
            .get(id)
            .map(|columns| columns.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }

    pub fn set_empty_state(&mut self, visible: bool) {
        self.empty_state_visible = visible;
    }

    pub fn empty_state_visible(&self) -> bool {
        self.empty_state_visible
    }

    /// Consistency sweep: drop order entries that reference no mounted node
    /// and collapse duplicate placements down to the first. Returns how many
    /// entries were removed.
    pub fn remove_duplicates(&mut self) -> usize {
        let mut removed = 0usize;
        let mut seen: Vec<ComponentId> = Vec::new();

        let nodes = &self.component_nodes;
        let mut sweep = |slot: &mut Vec<ComponentId>| {
            slot.retain(|id| {
                if !nodes.contains_key(id.as_str()) || seen.contains(id) {
                    removed += 1;
                    return false;
                }
                seen.push(id.clone());
                true
            });
        };

        sweep(&mut self.root_order);
        for columns in self.section_children.values_mut() {
            for slot in columns {
                sweep(slot);
            }
        }
        removed
    }

    /// Drop every node and order entry (full document reload).
    pub fn clear(&mut self) {
        self.component_nodes.clear();
        self.section_nodes.clear();
        self.root_order.clear();
        self.section_order.clear();
        self.section_children.clear();
        self.empty_state_visible = true;
    }
}
