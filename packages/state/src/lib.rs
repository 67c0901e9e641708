//! # Media Kit State
//!
//! Canonical document state for the media kit builder.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ store: one writer, many readers             │
//! │  - dispatch(Mutation) → atomic state swap   │
//! │  - subscribe → (previous, next) snapshots   │
//! │  - re-entrant dispatches queued, batching   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ differ: diff(previous, next) → StateDelta   │
//! │  - added / removed / updated / moved        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core principles
//!
//! 1. **State is the source of truth**: the rendered tree is a derived view
//! 2. **Mutations are tagged variants**: validated, then applied atomically
//! 3. **Unknown references degrade to warnings**: the builder stays usable
//!    even when a stale id surfaces
//! 4. **The component map is a map by construction**: no mutation path can
//!    leave `components` array-shaped

mod differ;
mod document;
mod history;
mod mutations;
mod store;

pub use differ::{diff, StateDelta};
pub use document::{
    ComponentMap, ComponentRecord, DocumentState, NormalizeReport, Placement, SectionColumns,
    SectionRecord, STATE_VERSION,
};
pub use history::UndoStack;
pub use mutations::{MoveTarget, Mutation, MutationError};
pub use store::{DispatchOutcome, Store, SubscriptionId};

// Re-export the id types; nearly every consumer of this crate needs them.
pub use mediakit_common::{ComponentId, SectionId};
