//! Join group execution.
//!
//! Each group runs in three phases:
//! - guard: every `on` guard of every sibling is checked for every row;
//!   a null or false guard drops the row
//! - dispatch: each sibling's expression is evaluated per surviving row,
//!   inline or as tasks on an executor behind the group's gate
//! - bind: once every evaluation has settled, successful values are bound
//!   under their alias, and any failure fails the whole group
//!
//! Rows keep their input order no matter how tasks complete.

use std::sync::{mpsc, Arc};

use super::evaluate::RowScope;
use super::pool::{ConcurrencyGate, TaskExecutor};
use super::types::Row;
use super::Engine;
use crate::error::{JoinError, MqlError, MqlResult, RowFailure};
use crate::mql::ast::{Dispatch, JoinGroup, JoinSpec};
use crate::mql::context::Context;
use crate::mql::value::Value;

type Slot = Option<MqlResult<Value>>;

impl Engine {
    pub(super) fn execute_join_group(
        &self,
        group: &JoinGroup,
        rows: Vec<Row>,
        context: &Context,
    ) -> MqlResult<Vec<Row>> {
        let rows_in = rows.len();
        let rows = apply_guards(group, rows, context)?;

        tracing::debug!(
            "Join group [{}]: {} row(s) in, {} passed guards",
            aliases(group),
            rows_in,
            rows.len()
        );

        let results = if group.is_async() {
            self.dispatch_async(group, rows, context)?
        } else {
            dispatch_sync(group, rows, context)
        };

        bind_results(group, results)
    }

    fn dispatch_async(
        &self,
        group: &JoinGroup,
        rows: Vec<Row>,
        context: &Context,
    ) -> MqlResult<Vec<(Row, Vec<Slot>)>> {
        let gate = group.concurrency_limit().map(ConcurrencyGate::new);
        let executors = group
            .specs
            .iter()
            .map(|spec| match &spec.dispatch {
                Dispatch::Async {
                    executor: Some(executor),
                    ..
                } => Ok(Some(Arc::clone(executor))),
                Dispatch::Async { executor: None, .. } => self.default_executor().map(Some),
                Dispatch::Sync => Ok(None),
            })
            .collect::<MqlResult<Vec<_>>>()?;

        let rows: Vec<Arc<Row>> = rows.into_iter().map(Arc::new).collect();
        let mut slots: Vec<Vec<Slot>> = rows
            .iter()
            .map(|_| group.specs.iter().map(|_| None).collect())
            .collect();

        let (tx, rx) = mpsc::channel::<(usize, usize, MqlResult<Value>)>();
        let mut pending = 0usize;

        for (i, row) in rows.iter().enumerate() {
            for (j, (spec, executor)) in group.specs.iter().zip(&executors).enumerate() {
                let Some(executor) = executor else {
                    // sync sibling inside an async group
                    slots[i][j] = Some(RowScope::new(row, context).evaluate(&spec.expression));
                    continue;
                };

                let permit = gate.as_ref().map(|gate| gate.acquire());
                let row = Arc::clone(row);
                let context = context.clone();
                let expression = Arc::clone(&spec.expression);
                let tx = tx.clone();

                executor.execute(Box::new(move || {
                    let result = RowScope::new(&row, &context).evaluate(&expression);
                    drop(row);
                    drop(permit);
                    // receiver outlives every task
                    let _ = tx.send((i, j, result));
                }));
                pending += 1;
            }
        }

        drop(tx);
        tracing::debug!(
            "Join group [{}]: dispatched {} task(s), waiting",
            aliases(group),
            pending
        );

        // Barrier: the channel closes once every task has settled
        for (i, j, result) in rx {
            slots[i][j] = Some(result);
        }

        Ok(rows
            .into_iter()
            .map(Arc::unwrap_or_clone)
            .zip(slots)
            .collect())
    }

    fn default_executor(&self) -> MqlResult<Arc<dyn TaskExecutor>> {
        let pool = self.default_pool.get_or_try_init(|| {
            tracing::info!(
                "Starting default join worker pool with {} thread(s)",
                self.config.worker_threads
            );
            super::WorkerPool::new(self.config.worker_threads, &self.config.thread_name_prefix)
                .map(Arc::new)
        })?;
        Ok(Arc::clone(pool) as Arc<dyn TaskExecutor>)
    }
}

fn apply_guards(group: &JoinGroup, rows: Vec<Row>, context: &Context) -> MqlResult<Vec<Row>> {
    let mut kept = Vec::with_capacity(rows.len());
    'rows: for row in rows {
        let scope = RowScope::new(&row, context);
        for guard in group.specs.iter().filter_map(|spec| spec.guard.as_ref()) {
            if matches!(scope.evaluate(guard)?, Value::Null | Value::Bool(false)) {
                continue 'rows;
            }
        }
        kept.push(row);
    }
    Ok(kept)
}

fn dispatch_sync(group: &JoinGroup, rows: Vec<Row>, context: &Context) -> Vec<(Row, Vec<Slot>)> {
    rows.into_iter()
        .map(|row| {
            let scope = RowScope::new(&row, context);
            let slots = group
                .specs
                .iter()
                .map(|spec| Some(scope.evaluate(&spec.expression)))
                .collect();
            (row, slots)
        })
        .collect()
}

fn bind_results(group: &JoinGroup, results: Vec<(Row, Vec<Slot>)>) -> MqlResult<Vec<Row>> {
    let mut rows = Vec::with_capacity(results.len());
    let mut failures = Vec::new();

    for (mut row, slots) in results {
        let mut failed = false;
        for (spec, slot) in group.specs.iter().zip(slots) {
            match slot {
                Some(Ok(value)) => row.bind(spec.alias.clone(), value),
                Some(Err(error)) => {
                    failed = true;
                    failures.push(failure(&row, spec, error));
                }
                None => {
                    failed = true;
                    let error = MqlError::InvalidQuery(format!(
                        "join task for '{}' did not complete",
                        spec.alias
                    ));
                    failures.push(failure(&row, spec, error));
                }
            }
        }
        if !failed {
            rows.push(row);
        }
    }

    if failures.is_empty() {
        return Ok(rows);
    }

    let error = JoinError::new(failures);
    tracing::warn!("Join group [{}] failed: {}", aliases(group), error);
    Err(error.into())
}

fn failure(row: &Row, spec: &JoinSpec, error: MqlError) -> RowFailure {
    RowFailure {
        row: row.source_index(),
        alias: spec.alias.clone(),
        error: Box::new(error),
    }
}

fn aliases(group: &JoinGroup) -> String {
    group
        .specs
        .iter()
        .map(|spec| spec.alias.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
