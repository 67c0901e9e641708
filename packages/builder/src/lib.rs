//! # Media Kit Builder
//!
//! Assembled engine for the media kit page builder: canonical state store,
//! change detection, render-gated reconciliation, and the public mutation
//! surface consumed by UI collaborators (drag-drop wiring, controls,
//! persistence).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mediakit_builder::MediaKitBuilder;
//! use mediakit_renderer::StaticRegistry;
//! use serde_json::json;
//! use std::rc::Rc;
//!
//! let mut registry = StaticRegistry::new();
//! registry.register("hero", |props| render_hero(props));
//!
//! let mut builder = MediaKitBuilder::new("post-1423", Rc::new(registry));
//! builder.initialize(saved_state).await;
//!
//! let id = builder.add_component("hero", json!({"title": "Jane Doe"}), None);
//! builder.flush().await;   // host tree now contains the hero node
//! ```

mod engine;
mod lifecycle;

pub use engine::MediaKitBuilder;
pub use lifecycle::ReadySignal;

// The pieces collaborators typically need alongside the engine.
pub use mediakit_common::{ComponentId, SectionId};
pub use mediakit_renderer::{
    ComponentRegistry, HostTree, NodeKind, RenderEvent, RenderPhase, StaticRegistry,
};
pub use mediakit_state::{
    DispatchOutcome, DocumentState, MoveTarget, SectionColumns, STATE_VERSION,
};
