use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Opaque identifier of a single placed component. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ComponentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// Allows map lookups keyed by ComponentId to accept plain &str.
impl Borrow<str> for ComponentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Opaque identifier of a layout section.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(String);

impl SectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for SectionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Derive a short document seed from a document identity string using CRC32.
pub fn document_seed(identity: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(identity.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential ID generator for components within a document.
///
/// Ids have the shape `{type}-{seed}-{n}`. The seed ties ids to a document
/// identity; the counter makes them unique within it. Deterministic under a
/// fixed seed, which keeps tests reproducible.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u32,
}

impl IdGenerator {
    pub fn new(identity: &str) -> Self {
        Self {
            seed: document_seed(identity),
            count: 0,
        }
    }

    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            count: 0,
        }
    }

    /// Generate the next component id for the given component type.
    pub fn next_component_id(&mut self, component_type: &str) -> ComponentId {
        self.count += 1;
        ComponentId::new(format!("{}-{}-{}", component_type, self.seed, self.count))
    }

    /// Generate the next section id.
    pub fn next_section_id(&mut self) -> SectionId {
        self.count += 1;
        SectionId::new(format!("section-{}-{}", self.seed, self.count))
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}
