//! Caller-supplied name → value mapping for one execution.
//!
//! A [`Context`] is read-only once built and cheap to clone, so join tasks on
//! worker threads share it freely. Names missing from the explicit values can
//! be resolved lazily through a [`Loader`]; each name is resolved at most once
//! per context, even when several tasks ask for it concurrently.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;

use super::capability::Capability;
use super::value::Value;
use crate::error::{MqlError, MqlResult};

/// Lazy resolution of context names, e.g. from a service registry.
pub trait Loader: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Value>;
}

impl<F> Loader for F
where
    F: Fn(&str) -> Option<Value> + Send + Sync,
{
    fn resolve(&self, name: &str) -> Option<Value> {
        self(name)
    }
}

#[derive(Clone, Default)]
pub struct Context {
    inner: Arc<ContextInner>,
}

#[derive(Default)]
struct ContextInner {
    values: HashMap<String, Value>,
    loader: Option<Arc<dyn Loader>>,
    /// Memoized loader results, `None` included
    resolved: DashMap<String, Arc<OnceCell<Option<Value>>>>,
    parent: Option<Context>,
}

impl Context {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Context backed only by a loader.
    pub fn with_loader(loader: impl Loader + 'static) -> Self {
        Self::builder().loader(loader).build()
    }

    /// Build a context from a JSON object; each top-level key becomes a name.
    pub fn from_json(json: serde_json::Value) -> MqlResult<Self> {
        match json {
            serde_json::Value::Object(map) => {
                let mut builder = Self::builder();
                for (name, value) in map {
                    builder = builder.value(name, Value::from(value));
                }
                Ok(builder.build())
            }
            other => Err(MqlError::Payload(format!(
                "context must be a JSON object, got {}",
                Value::from(other).type_name()
            ))),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> MqlResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let json: serde_json::Value = serde_json::from_str(&text)?;
        Self::from_json(json)
    }

    /// Look up a name: explicit values, then the loader, then the parent.
    /// `None` means the name is unknown; a known null is `Some(Value::Null)`.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.inner.values.get(name) {
            return Some(value.clone());
        }

        if let Some(loader) = &self.inner.loader {
            if let Some(value) = self.load(loader.as_ref(), name) {
                return Some(value);
            }
        }

        self.inner.parent.as_ref().and_then(|parent| parent.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Derive a child context where `name` is bound to `value` and every
    /// other name falls through to this context.
    pub fn with_binding(&self, name: impl Into<String>, value: impl Into<Value>) -> Context {
        Context::builder()
            .value(name, value)
            .parent(self.clone())
            .build()
    }

    fn load(&self, loader: &dyn Loader, name: &str) -> Option<Value> {
        // Clone the cell out so the shard lock is released before resolving
        let cell = self
            .inner
            .resolved
            .entry(name.to_string())
            .or_default()
            .clone();

        cell.get_or_init(|| {
            tracing::debug!("Context: resolving '{}' through loader", name);
            loader.resolve(name)
        })
        .clone()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.inner.values.keys().collect();
        names.sort();
        f.debug_struct("Context")
            .field("values", &names)
            .field("has_loader", &self.inner.loader.is_some())
            .field("has_parent", &self.inner.parent.is_some())
            .finish()
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    values: HashMap<String, Value>,
    loader: Option<Arc<dyn Loader>>,
    parent: Option<Context>,
}

impl ContextBuilder {
    pub fn value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn capability(self, name: impl Into<String>, capability: impl Capability + 'static) -> Self {
        self.value(name, Value::capability(capability))
    }

    pub fn loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    pub fn parent(mut self, parent: Context) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn build(self) -> Context {
        Context {
            inner: Arc::new(ContextInner {
                values: self.values,
                loader: self.loader,
                resolved: DashMap::new(),
                parent: self.parent,
            }),
        }
    }
}
