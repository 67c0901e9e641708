//! # Media Kit Common
//!
//! Shared primitives for the media kit builder engine: entity identifiers,
//! the seeded component-id generator, and helpers for the opaque JSON
//! payloads that flow through component records and global settings.

mod ids;
mod json;

pub use ids::{document_seed, ComponentId, IdGenerator, SectionId};
pub use json::{merge_object, value_object};
