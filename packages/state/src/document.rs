//! # Document Model
//!
//! The serializable document: a map of component records, a flat root
//! layout, optional layout sections, and opaque global settings.
//!
//! A component id has exactly one placement at any time: either a position
//! in the root `layout` or a slot inside one section column, never both.
//! `normalize` repairs documents arriving from external sources (persisted
//! JSON, collaborating editors) that violate this.

use mediakit_common::{value_object, ComponentId, SectionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Schema tag carried through serialization for the persistence collaborator.
pub const STATE_VERSION: &str = "3.0.0";

/// A single placed content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// Opaque unique id, immutable once created.
    pub id: ComponentId,

    /// Which registry renderer produces this component's markup.
    #[serde(rename = "type")]
    pub component_type: String,

    /// Free-form payload, passed through to the renderer untouched.
    #[serde(default)]
    pub props: Value,
}

impl ComponentRecord {
    pub fn new(id: ComponentId, component_type: impl Into<String>, props: Value) -> Self {
        Self {
            id,
            component_type: component_type.into(),
            props,
        }
    }
}

/// Mapping of component id → record.
///
/// A dedicated map type: there is no mutation path that can turn the
/// component collection into an array, which rules out a whole class of
/// shape-corruption bugs by construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentMap(BTreeMap<ComponentId, ComponentRecord>);

impl ComponentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record keyed by its own id. Returns the previous record for
    /// that id, if any.
    pub fn insert(&mut self, record: ComponentRecord) -> Option<ComponentRecord> {
        self.0.insert(record.id.clone(), record)
    }

    pub fn get(&self, id: &str) -> Option<&ComponentRecord> {
        self.0.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ComponentRecord> {
        self.0.get_mut(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<ComponentRecord> {
        self.0.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ComponentId> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ComponentId, &ComponentRecord)> {
        self.0.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &ComponentRecord> {
        self.0.values()
    }
}

/// Column arrangement of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionColumns {
    FullWidth,
    TwoColumn,
    ThreeColumn,
}

impl SectionColumns {
    pub fn count(&self) -> usize {
        match self {
            SectionColumns::FullWidth => 1,
            SectionColumns::TwoColumn => 2,
            SectionColumns::ThreeColumn => 3,
        }
    }
}

/// A layout section grouping components into columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub id: SectionId,
    pub columns: SectionColumns,

    /// One ordered component-id list per column.
    pub slots: Vec<Vec<ComponentId>>,
}

impl SectionRecord {
    /// Create an empty section with the right number of column slots.
    pub fn new(id: SectionId, columns: SectionColumns) -> Self {
        Self {
            id,
            columns,
            slots: vec![Vec::new(); columns.count()],
        }
    }

    /// Iterate component ids in column order.
    pub fn component_ids(&self) -> impl Iterator<Item = &ComponentId> {
        self.slots.iter().flatten()
    }
}

/// Where a component sits in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Index into the root layout.
    Root(usize),

    /// Slot inside one section column.
    InSection {
        section: SectionId,
        column: usize,
        index: usize,
    },
}

/// Root document state. Serialized shape is what the persistence
/// collaborator stores; this crate owns its invariants, not its transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentState {
    pub components: ComponentMap,

    /// Root-level component order. Ids assigned to a section are absent here.
    #[serde(default)]
    pub layout: Vec<ComponentId>,

    #[serde(default)]
    pub sections: Vec<SectionRecord>,

    /// Opaque theme / global settings pass-through.
    #[serde(default)]
    pub settings: Value,

    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    STATE_VERSION.to_string()
}

impl Default for DocumentState {
    fn default() -> Self {
        Self {
            components: ComponentMap::new(),
            layout: Vec::new(),
            sections: Vec::new(),
            settings: Value::Object(serde_json::Map::new()),
            version: default_version(),
        }
    }
}

/// What `normalize` repaired.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeReport {
    /// Layout / section references with no backing record.
    pub dropped_refs: Vec<ComponentId>,

    /// Records too malformed to keep.
    pub dropped_components: Vec<ComponentId>,

    /// Records recovered (e.g. type inferred from the id).
    pub recovered: Vec<ComponentId>,

    /// Second and later placements removed for ids placed more than once.
    pub deduped_placements: usize,

    /// Records with no placement, appended to the root layout.
    pub reattached: Vec<ComponentId>,
}

impl NormalizeReport {
    pub fn is_clean(&self) -> bool {
        self.dropped_refs.is_empty()
            && self.dropped_components.is_empty()
            && self.recovered.is_empty()
            && self.deduped_placements == 0
            && self.reattached.is_empty()
    }
}

impl DocumentState {
    /// True iff at least one component exists. Derived, never cached.
    pub fn has_content(&self) -> bool {
        !self.components.is_empty()
    }

    /// Find a section by id.
    pub fn section(&self, id: &str) -> Option<&SectionRecord> {
        self.sections.iter().find(|s| s.id.as_str() == id)
    }

    pub fn section_mut(&mut self, id: &str) -> Option<&mut SectionRecord> {
        self.sections.iter_mut().find(|s| s.id.as_str() == id)
    }

    /// Current placement of a component id, if it is placed at all.
    pub fn placement_of(&self, id: &str) -> Option<Placement> {
        if let Some(index) = self.layout.iter().position(|c| c.as_str() == id) {
            return Some(Placement::Root(index));
        }
        for section in &self.sections {
            for (column, slot) in section.slots.iter().enumerate() {
                if let Some(index) = slot.iter().position(|c| c.as_str() == id) {
                    return Some(Placement::InSection {
                        section: section.id.clone(),
                        column,
                        index,
                    });
                }
            }
        }
        None
    }

    /// Remove a component id from wherever it is placed. Returns whether a
    /// placement was removed. The record itself is untouched.
    pub fn detach_placement(&mut self, id: &str) -> bool {
        if let Some(index) = self.layout.iter().position(|c| c.as_str() == id) {
            self.layout.remove(index);
            return true;
        }
        for section in &mut self.sections {
            for slot in &mut section.slots {
                if let Some(index) = slot.iter().position(|c| c.as_str() == id) {
                    slot.remove(index);
                    return true;
                }
            }
        }
        false
    }

    /// All placed component ids with their placements, in visual order:
    /// root layout first, then sections in order, columns in order.
    pub fn render_order(&self) -> Vec<(ComponentId, Placement)> {
        let mut out = Vec::with_capacity(self.components.len());
        for (index, id) in self.layout.iter().enumerate() {
            out.push((id.clone(), Placement::Root(index)));
        }
        for section in &self.sections {
            for (column, slot) in section.slots.iter().enumerate() {
                for (index, id) in slot.iter().enumerate() {
                    out.push((
                        id.clone(),
                        Placement::InSection {
                            section: section.id.clone(),
                            column,
                            index,
                        },
                    ));
                }
            }
        }
        out
    }

    /// Placement lookup table for the differ.
    pub fn placements(&self) -> BTreeMap<ComponentId, Placement> {
        self.render_order().into_iter().collect()
    }

    /// Repair structural damage from external sources without failing.
    ///
    /// - records with an empty type get it re-inferred from the id prefix,
    ///   or are dropped if that fails
    /// - layout/section references without a record are dropped
    /// - ids placed more than once keep only their first placement
    /// - records with no placement are appended to the root layout
    /// - section slot counts are aligned with their column arrangement
    /// - non-object settings are coerced to an empty object
    pub fn normalize(&mut self) -> NormalizeReport {
        let mut report = NormalizeReport::default();

        // Settings must be object-shaped.
        if !self.settings.is_object() {
            self.settings = Value::Object(value_object(self.settings.take()));
        }

        // Repair or drop malformed records.
        let malformed: Vec<ComponentId> = self
            .components
            .iter()
            .filter(|(_, record)| record.component_type.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        for id in malformed {
            let inferred = id
                .as_str()
                .split('-')
                .next()
                .filter(|prefix| !prefix.is_empty())
                .map(str::to_string);
            match inferred {
                Some(component_type) => {
                    if let Some(record) = self.components.get_mut(id.as_str()) {
                        warn!(component_id = %id, %component_type, "recovered component type from id");
                        record.component_type = component_type;
                        report.recovered.push(id);
                    }
                }
                None => {
                    warn!(component_id = %id, "dropping component with no recoverable type");
                    self.components.remove(id.as_str());
                    report.dropped_components.push(id);
                }
            }
        }

        // Align slot counts with the declared column arrangement.
        for section in &mut self.sections {
            let expected = section.columns.count();
            while section.slots.len() > expected {
                let overflow = section.slots.pop().unwrap_or_default();
                if let Some(last) = section.slots.last_mut() {
                    last.extend(overflow);
                }
            }
            while section.slots.len() < expected {
                section.slots.push(Vec::new());
            }
        }

        // Single placement per id, records only. First placement wins,
        // scanning the root layout before sections.
        let mut seen: BTreeSet<ComponentId> = BTreeSet::new();
        let components = self.components.clone();
        let mut dropped_refs = Vec::new();
        let mut deduped = 0usize;

        self.layout.retain(|id| {
            if !components.contains(id.as_str()) {
                dropped_refs.push(id.clone());
                return false;
            }
            if !seen.insert(id.clone()) {
                deduped += 1;
                return false;
            }
            true
        });
        for section in &mut self.sections {
            for slot in &mut section.slots {
                slot.retain(|id| {
                    if !components.contains(id.as_str()) {
                        dropped_refs.push(id.clone());
                        return false;
                    }
                    if !seen.insert(id.clone()) {
                        deduped += 1;
                        return false;
                    }
                    true
                });
            }
        }

        // Records with no placement would never render; reattach at the end
        // of the root layout.
        for id in components.ids() {
            if !seen.contains(id) && self.components.contains(id.as_str()) {
                self.layout.push(id.clone());
                report.reattached.push(id.clone());
            }
        }

        if !dropped_refs.is_empty() {
            warn!(count = dropped_refs.len(), "dropped dangling layout references");
        }
        if deduped > 0 {
            warn!(count = deduped, "removed duplicate component placements");
        }
        report.dropped_refs = dropped_refs;
        report.deduped_placements = deduped;
        report
    }
}
