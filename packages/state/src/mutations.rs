//! # State Mutations
//!
//! Tagged mutation variants over [`DocumentState`].
//!
//! ## Design principles
//!
//! 1. **Intent-preserving**: each variant is a semantic operation, decoupled
//!    from any UI affordance or display text
//! 2. **Validated**: structural constraints are checked before anything is
//!    touched
//! 3. **Single placement**: a move is detach-then-insert at the data level,
//!    never duplicate-then-delete

use crate::document::{ComponentRecord, DocumentState, SectionRecord};
use mediakit_common::{merge_object, ComponentId, SectionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Movement target for [`Mutation::MoveComponent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveTarget {
    Up,
    Down,
    Index(usize),
}

/// Semantic mutations over the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    /// Insert a new component record into the root layout.
    AddComponent {
        record: ComponentRecord,
        position: Option<usize>,
    },

    /// Remove a component and its placement.
    RemoveComponent { id: ComponentId },

    /// Shallow-merge a patch into a component's props.
    UpdateComponent { id: ComponentId, patch: Value },

    /// Reposition a component within its current container.
    MoveComponent { id: ComponentId, to: MoveTarget },

    /// Replace the root layout order wholesale.
    SetLayout { order: Vec<ComponentId> },

    /// Shallow-merge a patch into the global settings.
    UpdateSettings { patch: Value },

    /// Insert a new section.
    AddSection {
        record: SectionRecord,
        position: Option<usize>,
    },

    /// Remove a section; its components return to the root layout.
    RemoveSection { id: SectionId },

    /// Move a component into a section column (appended to that slot).
    AssignToSection {
        id: ComponentId,
        section: SectionId,
        column: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("component not found: {0}")]
    UnknownComponent(ComponentId),

    #[error("section not found: {0}")]
    UnknownSection(SectionId),

    #[error("component already exists: {0}")]
    DuplicateComponent(ComponentId),

    #[error("section already exists: {0}")]
    DuplicateSection(SectionId),

    #[error("section {section} has {columns} columns, column {column} requested")]
    ColumnOutOfRange {
        section: SectionId,
        column: usize,
        columns: usize,
    },
}

impl Mutation {
    /// Short label for logs and history descriptions.
    pub fn describe(&self) -> String {
        match self {
            Mutation::AddComponent { record, .. } => {
                format!("add {} ({})", record.id, record.component_type)
            }
            Mutation::RemoveComponent { id } => format!("remove {id}"),
            Mutation::UpdateComponent { id, .. } => format!("update {id}"),
            Mutation::MoveComponent { id, .. } => format!("move {id}"),
            Mutation::SetLayout { .. } => "set layout".to_string(),
            Mutation::UpdateSettings { .. } => "update settings".to_string(),
            Mutation::AddSection { record, .. } => format!("add section {}", record.id),
            Mutation::RemoveSection { id } => format!("remove section {id}"),
            Mutation::AssignToSection { id, section, .. } => {
                format!("assign {id} to {section}")
            }
        }
    }

    /// Validate without applying.
    pub fn validate(&self, state: &DocumentState) -> Result<(), MutationError> {
        match self {
            Mutation::AddComponent { record, .. } => {
                if state.components.contains(record.id.as_str()) {
                    return Err(MutationError::DuplicateComponent(record.id.clone()));
                }
                Ok(())
            }

            Mutation::RemoveComponent { id }
            | Mutation::UpdateComponent { id, .. }
            | Mutation::MoveComponent { id, .. } => {
                if !state.components.contains(id.as_str()) {
                    return Err(MutationError::UnknownComponent(id.clone()));
                }
                Ok(())
            }

            Mutation::SetLayout { .. } | Mutation::UpdateSettings { .. } => Ok(()),

            Mutation::AddSection { record, .. } => {
                if state.section(record.id.as_str()).is_some() {
                    return Err(MutationError::DuplicateSection(record.id.clone()));
                }
                Ok(())
            }

            Mutation::RemoveSection { id } => {
                if state.section(id.as_str()).is_none() {
                    return Err(MutationError::UnknownSection(id.clone()));
                }
                Ok(())
            }

            Mutation::AssignToSection {
                id,
                section,
                column,
            } => {
                if !state.components.contains(id.as_str()) {
                    return Err(MutationError::UnknownComponent(id.clone()));
                }
                let target = state
                    .section(section.as_str())
                    .ok_or_else(|| MutationError::UnknownSection(section.clone()))?;
                if *column >= target.columns.count() {
                    return Err(MutationError::ColumnOutOfRange {
                        section: section.clone(),
                        column: *column,
                        columns: target.columns.count(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Validate, then apply to the state. On error the state is untouched.
    pub fn apply(&self, state: &mut DocumentState) -> Result<(), MutationError> {
        self.validate(state)?;

        match self {
            Mutation::AddComponent { record, position } => {
                Self::apply_add(state, record.clone(), *position);
            }

            Mutation::RemoveComponent { id } => {
                state.detach_placement(id.as_str());
                state.components.remove(id.as_str());
            }

            Mutation::UpdateComponent { id, patch } => {
                if let Some(record) = state.components.get_mut(id.as_str()) {
                    merge_object(&mut record.props, patch);
                }
            }

            Mutation::MoveComponent { id, to } => {
                Self::apply_move(state, id, *to);
            }

            Mutation::SetLayout { order } => {
                Self::apply_set_layout(state, order);
            }

            Mutation::UpdateSettings { patch } => {
                merge_object(&mut state.settings, patch);
            }

            Mutation::AddSection { record, position } => {
                Self::apply_add_section(state, record.clone(), *position);
            }

            Mutation::RemoveSection { id } => {
                Self::apply_remove_section(state, id);
            }

            Mutation::AssignToSection {
                id,
                section,
                column,
            } => {
                state.detach_placement(id.as_str());
                if let Some(slot) = state
                    .section_mut(section.as_str())
                    .and_then(|target| target.slots.get_mut(*column))
                {
                    slot.push(id.clone());
                }
            }
        }

        Ok(())
    }

    fn apply_add(state: &mut DocumentState, record: ComponentRecord, position: Option<usize>) {
        let id = record.id.clone();
        state.components.insert(record);
        let index = position.unwrap_or(state.layout.len()).min(state.layout.len());
        state.layout.insert(index, id);
    }

    fn apply_move(state: &mut DocumentState, id: &ComponentId, to: MoveTarget) {
        // Locate the ordered list the component currently lives in; moves
        // stay within that container.
        let slot: Option<&mut Vec<ComponentId>> =
            if state.layout.iter().any(|c| c == id) {
                Some(&mut state.layout)
            } else {
                state
                    .sections
                    .iter_mut()
                    .flat_map(|s| s.slots.iter_mut())
                    .find(|slot| slot.iter().any(|c| c == id))
            };

        let Some(slot) = slot else {
            // Record exists but has no placement; normalize repairs this.
            return;
        };
        let Some(from) = slot.iter().position(|c| c == id) else {
            return;
        };

        let target = match to {
            MoveTarget::Up => from.saturating_sub(1),
            MoveTarget::Down => (from + 1).min(slot.len() - 1),
            MoveTarget::Index(index) => index.min(slot.len() - 1),
        };
        if target == from {
            return;
        }
        let moved = slot.remove(from);
        slot.insert(target, moved);
    }

    fn apply_set_layout(state: &mut DocumentState, order: &[ComponentId]) {
        let previous_root = state.layout.clone();

        // Keep only ids with a backing record, first occurrence wins.
        let mut next: Vec<ComponentId> = Vec::with_capacity(order.len());
        for id in order {
            if state.components.contains(id.as_str()) && !next.contains(id) {
                next.push(id.clone());
            }
        }

        // Ids pulled into the root order leave their section slots; ids the
        // new order omits keep their previous relative order at the end, so
        // no component silently loses its placement.
        state.layout.clear();
        for id in &next {
            state.detach_placement(id.as_str());
        }
        for id in previous_root {
            if !next.contains(&id) && state.components.contains(id.as_str()) {
                next.push(id);
            }
        }
        state.layout = next;
    }

    fn apply_add_section(state: &mut DocumentState, mut record: SectionRecord, position: Option<usize>) {
        // Slot lists must match the column arrangement.
        let expected = record.columns.count();
        record.slots.resize(expected, Vec::new());

        // Ids listed in the new section's slots move out of their current
        // placement; unknown ids are dropped.
        let mut claimed: Vec<ComponentId> = Vec::new();
        for slot in &mut record.slots {
            slot.retain(|id| {
                state.components.contains(id.as_str()) && !claimed.contains(id) && {
                    claimed.push(id.clone());
                    true
                }
            });
        }
        for id in &claimed {
            state.detach_placement(id.as_str());
        }

        let index = position.unwrap_or(state.sections.len()).min(state.sections.len());
        state.sections.insert(index, record);
    }

    fn apply_remove_section(state: &mut DocumentState, id: &SectionId) {
        if let Some(index) = state.sections.iter().position(|s| &s.id == id) {
            let section = state.sections.remove(index);
            // Orphaned components fall back to the end of the root layout.
            for component in section.slots.into_iter().flatten() {
                state.layout.push(component);
            }
        }
    }
}
