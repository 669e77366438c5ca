//! Capability dispatch: host objects exposing named operations of fixed arity.
//!
//! Query text such as `twitter.getUserInfo(p.twitterId)` evaluates `twitter`
//! to a [`Value::Capability`] and dispatches `getUserInfo` with one argument.
//! Host adapters either implement [`Capability`] directly or register
//! closures in an [`OperationRegistry`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::value::Value;

/// A host value whose operations are looked up by `(name, arity)`.
pub trait Capability: Send + Sync {
    /// Name used in error messages and textual output.
    fn type_name(&self) -> &str;

    fn has_operation(&self, name: &str, arity: usize) -> bool;

    /// Invoke an operation. Only called after `has_operation` returned true.
    fn invoke(&self, name: &str, args: &[Value]) -> anyhow::Result<Value>;
}

type OperationFn = Arc<dyn Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync>;

/// Explicit registry of operations keyed by `(name, arity)`.
///
/// ```rust
/// use mql::{OperationRegistry, Value, Object};
///
/// let twitter = OperationRegistry::new("twitter").operation("getUserInfo", 1, |args| {
///     let tweets = if args[0].as_str() == Some("joeschmoe") { 4 } else { 5 };
///     Ok(Object::new().with("totalTweets", tweets).into())
/// });
/// let value = Value::capability(twitter);
/// assert_eq!(value.type_name(), "capability");
/// ```
#[derive(Clone)]
pub struct OperationRegistry {
    type_name: String,
    operations: HashMap<(String, usize), OperationFn>,
}

impl OperationRegistry {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            operations: HashMap::new(),
        }
    }

    /// Register an operation. Registering the same `(name, arity)` twice
    /// replaces the earlier closure.
    pub fn operation<F>(mut self, name: impl Into<String>, arity: usize, op: F) -> Self
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.operations.insert((name.into(), arity), Arc::new(op));
        self
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ops: Vec<String> = self
            .operations
            .keys()
            .map(|(name, arity)| format!("{}/{}", name, arity))
            .collect();
        ops.sort();
        f.debug_struct("OperationRegistry")
            .field("type_name", &self.type_name)
            .field("operations", &ops)
            .finish()
    }
}

impl Capability for OperationRegistry {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn has_operation(&self, name: &str, arity: usize) -> bool {
        self.operations.contains_key(&(name.to_string(), arity))
    }

    fn invoke(&self, name: &str, args: &[Value]) -> anyhow::Result<Value> {
        match self.operations.get(&(name.to_string(), args.len())) {
            Some(op) => op(args),
            None => anyhow::bail!("{}/{} is not registered", name, args.len()),
        }
    }
}

/// Getter name for a property segment: `totalTweets` -> `getTotalTweets`.
pub(crate) fn getter_name(property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("get{}{}", first.to_uppercase(), chars.as_str()),
        None => "get".to_string(),
    }
}
