//! # Component Registry Contract
//!
//! The registry maps a component type string to a markup-producing renderer.
//! It is implemented by an external collaborator; the reconciler only
//! consumes this trait. Markup production may suspend (template fetch), so
//! `render` is async — the engine's single asynchronous boundary.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("renderer for '{component_type}' failed: {reason}")]
    RenderFailed {
        component_type: String,
        reason: String,
    },
}

/// Markup supplier keyed by component type. Futures are `?Send`: the engine
/// is single-threaded and cooperative.
#[async_trait(?Send)]
pub trait ComponentRegistry {
    fn has_renderer(&self, component_type: &str) -> bool;

    /// Produce markup for a component's props. The payload is opaque to the
    /// engine; it is stored on the mounted node verbatim.
    async fn render(&self, component_type: &str, props: &Value) -> Result<String, RegistryError>;
}

type RenderFn = Box<dyn Fn(&Value) -> Result<String, RegistryError>>;

struct Entry {
    render: RenderFn,
    delay: Option<Duration>,
}

/// Closure-backed registry.
///
/// Mirrors a client-side template map; also serves as the test harness for
/// async-race scenarios via per-type artificial delays.
#[derive(Default)]
pub struct StaticRegistry {
    renderers: HashMap<String, Entry>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a synchronous renderer for a type.
    pub fn register(
        &mut self,
        component_type: impl Into<String>,
        render: impl Fn(&Value) -> String + 'static,
    ) {
        self.renderers.insert(
            component_type.into(),
            Entry {
                render: Box::new(move |props| Ok(render(props))),
                delay: None,
            },
        );
    }

    /// Register a renderer whose markup resolves after a delay, emulating a
    /// template fetch.
    pub fn register_delayed(
        &mut self,
        component_type: impl Into<String>,
        delay: Duration,
        render: impl Fn(&Value) -> String + 'static,
    ) {
        self.renderers.insert(
            component_type.into(),
            Entry {
                render: Box::new(move |props| Ok(render(props))),
                delay: Some(delay),
            },
        );
    }

    /// Register a renderer that always fails, for error-path tests.
    pub fn register_failing(&mut self, component_type: impl Into<String>, reason: impl Into<String>) {
        let component_type = component_type.into();
        let reason = reason.into();
        let failing_type = component_type.clone();
        self.renderers.insert(
            component_type,
            Entry {
                render: Box::new(move |_| {
                    Err(RegistryError::RenderFailed {
                        component_type: failing_type.clone(),
                        reason: reason.clone(),
                    })
                }),
                delay: None,
            },
        );
    }
}

#[async_trait(?Send)]
impl ComponentRegistry for StaticRegistry {
    fn has_renderer(&self, component_type: &str) -> bool {
        self.renderers.contains_key(component_type)
    }

    async fn render(&self, component_type: &str, props: &Value) -> Result<String, RegistryError> {
        let entry = self
            .renderers
            .get(component_type)
            .ok_or_else(|| RegistryError::RenderFailed {
                component_type: component_type.to_string(),
                reason: "no renderer registered".to_string(),
            })?;
        if let Some(delay) = entry.delay {
            tokio::time::sleep(delay).await;
        }
        (entry.render)(props)
    }
}
