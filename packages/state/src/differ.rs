//! # Change Detection
//!
//! Pure diff of two [`DocumentState`] snapshots into a [`StateDelta`].
//!
//! A delta is created fresh per store notification, consumed synchronously
//! by the renderer, and discarded. It is never persisted.

use crate::document::DocumentState;
use mediakit_common::{ComponentId, SectionId};
use std::collections::BTreeSet;

/// Structured difference between two state snapshots.
///
/// Sets are ordered (`BTreeSet`) so processing is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDelta {
    /// Present in next but not previous.
    pub added: BTreeSet<ComponentId>,

    /// Present in previous but not next.
    pub removed: BTreeSet<ComponentId>,

    /// Present in both with a changed payload or type.
    pub updated: BTreeSet<ComponentId>,

    /// Present in both with a changed placement. May overlap `updated`;
    /// a pure reorder lands here and only here.
    pub moved: BTreeSet<ComponentId>,

    pub sections_added: BTreeSet<SectionId>,
    pub sections_removed: BTreeSet<SectionId>,

    /// Sections whose column arrangement changed.
    pub sections_updated: BTreeSet<SectionId>,

    /// Placement references in next with no backing record. A consistency
    /// violation the differ surfaces rather than hides; the store prevents
    /// it, but externally built snapshots may carry it.
    pub dangling: Vec<ComponentId>,

    /// True when the global settings payload changed.
    pub settings_changed: bool,
}

impl StateDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.updated.is_empty()
            && self.moved.is_empty()
            && self.sections_added.is_empty()
            && self.sections_removed.is_empty()
            && self.sections_updated.is_empty()
            && self.dangling.is_empty()
            && !self.settings_changed
    }
}

/// Compute the delta between two snapshots. Pure and deterministic; no I/O.
pub fn diff(previous: &DocumentState, next: &DocumentState) -> StateDelta {
    let mut delta = StateDelta::default();

    for (id, record) in next.components.iter() {
        match previous.components.get(id.as_str()) {
            None => {
                delta.added.insert(id.clone());
            }
            Some(before) => {
                // Deep payload comparison; snapshots are rebuilt per
                // dispatch, so reference identity means nothing here.
                if before.component_type != record.component_type
                    || before.props != record.props
                {
                    delta.updated.insert(id.clone());
                }
            }
        }
    }
    for (id, _) in previous.components.iter() {
        if !next.components.contains(id.as_str()) {
            delta.removed.insert(id.clone());
        }
    }

    // Placement comparison is separate from payload comparison: a pure
    // reorder must fire `moved`, never `updated`.
    let before_placements = previous.placements();
    let after_placements = next.placements();
    for (id, placement) in &after_placements {
        if !next.components.contains(id.as_str()) {
            delta.dangling.push(id.clone());
            continue;
        }
        if delta.added.contains(id) {
            continue;
        }
        if before_placements.get(id) != Some(placement) {
            delta.moved.insert(id.clone());
        }
    }

    for section in &next.sections {
        match previous.section(section.id.as_str()) {
            None => {
                delta.sections_added.insert(section.id.clone());
            }
            Some(before) => {
                if before.columns != section.columns {
                    delta.sections_updated.insert(section.id.clone());
                }
            }
        }
    }
    for section in &previous.sections {
        if next.section(section.id.as_str()).is_none() {
            delta.sections_removed.insert(section.id.clone());
        }
    }

    delta.settings_changed = previous.settings != next.settings;
    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ComponentRecord, SectionColumns, SectionRecord};
    use serde_json::json;

    fn record(id: &str, ty: &str, props: serde_json::Value) -> ComponentRecord {
        ComponentRecord::new(ComponentId::from(id), ty, props)
    }

    fn state_with(ids: &[&str]) -> DocumentState {
        let mut state = DocumentState::default();
        for id in ids {
            state.components.insert(record(id, "hero", json!({})));
            state.layout.push(ComponentId::from(*id));
        }
        state
    }

    #[test]
    fn test_diff_detects_added() {
        let previous = DocumentState::default();
        let next = state_with(&["c1"]);

        let delta = diff(&previous, &next);
        assert_eq!(delta.added, BTreeSet::from([ComponentId::from("c1")]));
        assert!(delta.removed.is_empty());
        assert!(delta.moved.is_empty());
    }

    #[test]
    fn test_diff_detects_removed() {
        let previous = state_with(&["c1"]);
        let next = DocumentState::default();

        let delta = diff(&previous, &next);
        assert_eq!(delta.removed, BTreeSet::from([ComponentId::from("c1")]));
        assert!(delta.added.is_empty());
    }

    #[test]
    fn test_diff_detects_payload_update() {
        let mut previous = DocumentState::default();
        previous.components.insert(record("c1", "hero", json!({"title": "A"})));
        previous.layout.push(ComponentId::from("c1"));

        let mut next = previous.clone();
        next.components
            .get_mut("c1")
            .unwrap()
            .props = json!({"title": "B"});

        let delta = diff(&previous, &next);
        assert_eq!(delta.updated, BTreeSet::from([ComponentId::from("c1")]));
        assert!(delta.moved.is_empty());
    }

    #[test]
    fn test_pure_reorder_is_moved_not_updated() {
        let previous = state_with(&["a", "b"]);
        let mut next = previous.clone();
        next.layout.swap(0, 1);

        let delta = diff(&previous, &next);
        assert!(delta.updated.is_empty());
        assert_eq!(
            delta.moved,
            BTreeSet::from([ComponentId::from("a"), ComponentId::from("b")])
        );
    }

    #[test]
    fn test_update_and_move_can_overlap() {
        let previous = state_with(&["a", "b"]);
        let mut next = previous.clone();
        next.layout.swap(0, 1);
        next.components.get_mut("a").unwrap().props = json!({"x": 1});

        let delta = diff(&previous, &next);
        assert!(delta.updated.contains(&ComponentId::from("a")));
        assert!(delta.moved.contains(&ComponentId::from("a")));
    }

    #[test]
    fn test_added_ids_are_not_also_moved() {
        let previous = state_with(&["a"]);
        let mut next = previous.clone();
        next.components.insert(record("b", "hero", json!({})));
        next.layout.insert(0, ComponentId::from("b"));

        let delta = diff(&previous, &next);
        assert_eq!(delta.added, BTreeSet::from([ComponentId::from("b")]));
        assert!(!delta.moved.contains(&ComponentId::from("b")));
        // "a" shifted from index 0 to 1.
        assert!(delta.moved.contains(&ComponentId::from("a")));
    }

    #[test]
    fn test_dangling_references_are_surfaced() {
        let previous = DocumentState::default();
        let mut next = DocumentState::default();
        next.layout.push(ComponentId::from("ghost"));

        let delta = diff(&previous, &next);
        assert_eq!(delta.dangling, vec![ComponentId::from("ghost")]);
    }

    #[test]
    fn test_section_assignment_moves_component() {
        let previous = state_with(&["a"]);
        let mut next = previous.clone();
        let mut section = SectionRecord::new(SectionId::from("s1"), SectionColumns::FullWidth);
        next.detach_placement("a");
        section.slots[0].push(ComponentId::from("a"));
        next.sections.push(section);

        let delta = diff(&previous, &next);
        assert!(delta.moved.contains(&ComponentId::from("a")));
        assert_eq!(delta.sections_added, BTreeSet::from([SectionId::from("s1")]));
        assert!(delta.updated.is_empty());
    }

    #[test]
    fn test_settings_change_is_flagged() {
        let previous = DocumentState::default();
        let mut next = DocumentState::default();
        next.settings = json!({"theme": "dark"});

        let delta = diff(&previous, &next);
        assert!(delta.settings_changed);
        assert!(delta.added.is_empty());
    }

    #[test]
    fn test_identical_states_produce_empty_delta() {
        let state = state_with(&["a", "b"]);
        let delta = diff(&state, &state.clone());
        assert!(delta.is_empty());
    }
}
