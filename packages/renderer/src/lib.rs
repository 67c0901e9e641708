//! # Media Kit Renderer
//!
//! Reconciles document state into a host tree of mounted nodes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ store: dispatch → (previous, next)          │
//! └─────────────────────────────────────────────┘
//!                     ↓  (queued, FIFO)
//! ┌─────────────────────────────────────────────┐
//! │ reconciler: diff → removed → added →        │
//! │             moved → updated                 │
//! │  - render gate arbitrates every mount       │
//! │  - registry produces markup (may await)     │
//! │  - host tree is the only mutated surface    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ controls layer: render-complete events      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The reconciler processes one notification at a time; a dispatch that
//! lands while a mount is awaiting markup queues behind it. The render gate
//! is the single arbitration point for mounts, which is what makes multiple
//! uncoordinated triggers (subscription, forced re-render) safe.

mod dom;
mod gate;
mod reconciler;
mod registry;

pub use dom::{HostTree, MountedNode, NodeKind};
pub use gate::{GateState, RenderGate};
pub use reconciler::{Reconciler, RenderEvent, RenderPhase};
pub use registry::{ComponentRegistry, RegistryError, StaticRegistry};
