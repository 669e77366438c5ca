//! MQL Query Executor
//!
//! Runs a compiled [`Query`] against a [`Context`]: binds the `from` source,
//! expands rows group by group, filters with the restriction and projects
//! each surviving row.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::ast::*;
use super::context::Context;
use super::value::{Object, Value};
use crate::error::{MqlError, MqlResult};

mod evaluate;
pub mod helpers;
mod join;
mod pool;
mod projection;
mod restriction;
pub mod types;

pub use evaluate::RowScope;
pub use helpers::{add_values, compare_values, to_bool};
pub use pool::{ConcurrencyGate, GatePermit, Task, TaskExecutor, WorkerPool};
pub use types::Row;

/// Engine settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Threads in the default join pool
    pub worker_threads: usize,
    pub thread_name_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            thread_name_prefix: "mql-worker".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn single_threaded() -> Self {
        Self {
            worker_threads: 1,
            ..Self::default()
        }
    }
}

/// Query engine. Owns the default worker pool for async joins, which is
/// started on first use and shut down when the engine drops.
pub struct Engine {
    config: EngineConfig,
    default_pool: OnceCell<Arc<WorkerPool>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            default_pool: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn has_default_pool(&self) -> bool {
        self.default_pool.get().is_some()
    }

    /// Execute a query, blocking until every row is projected.
    /// Either all results are returned or the first error.
    pub fn execute(&self, query: &Query, context: &Context) -> MqlResult<Vec<Object>> {
        let mut rows = bind_source(&query.from, context)?;
        tracing::debug!(
            "Query: {} row(s) from '{}' as '{}'",
            rows.len(),
            query.from.source,
            query.from.alias
        );

        for group in &query.joins {
            rows = self.execute_join_group(group, rows, context)?;
        }

        if let Some(restriction) = &query.restriction {
            let before = rows.len();
            let mut kept = Vec::with_capacity(before);
            for row in rows {
                if RowScope::new(&row, context).satisfies(restriction)? {
                    kept.push(row);
                }
            }
            rows = kept;
            tracing::debug!("Restriction: {} of {} row(s) kept", rows.len(), before);
        }

        let results = rows
            .iter()
            .map(|row| RowScope::new(row, context).project(&query.select))
            .collect::<MqlResult<Vec<_>>>()?;

        tracing::debug!("Projection: {} result(s)", results.len());
        Ok(results)
    }

    /// Parse then execute.
    pub fn execute_text(&self, text: &str, context: &Context) -> MqlResult<Vec<Object>> {
        let query = super::parser::parse(text)?;
        self.execute(&query, context)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("default_pool", &self.has_default_pool())
            .finish()
    }
}

/// One row per array element; any other value is a single row.
fn bind_source(from: &FromClause, context: &Context) -> MqlResult<Vec<Row>> {
    match context.get(&from.source) {
        None => Err(MqlError::UnresolvedVariable(format!(
            "from source '{}' is not defined",
            from.source
        ))),
        Some(Value::Null) => Err(MqlError::UnresolvedVariable(format!(
            "from source '{}' is null",
            from.source
        ))),
        Some(Value::Array(items)) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, item)| Row::new(i, from.alias.clone(), item))
            .collect()),
        Some(single) => Ok(vec![Row::new(0, from.alias.clone(), single)]),
    }
}

impl Query {
    /// Execute with a transient engine.
    pub fn execute(&self, context: &Context) -> MqlResult<Vec<Object>> {
        Engine::new().execute(self, context)
    }
}

/// Parse and execute query text with a transient engine.
pub fn execute(text: &str, context: &Context) -> MqlResult<Vec<Object>> {
    Engine::new().execute_text(text, context)
}
