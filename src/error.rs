use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MqlError {
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Unresolved variable: {0}")]
    UnresolvedVariable(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error(transparent)]
    Join(#[from] JoinError),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid payload: {0}")]
    Payload(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type MqlResult<T> = Result<T, MqlError>;

impl MqlError {
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        MqlError::Parse {
            position,
            message: message.into(),
        }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        MqlError::TypeMismatch(message.into())
    }
}

impl serde::Serialize for MqlError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Failure to dispatch an operation on a capability value.
#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("Invocation error: no operation '{operation}' taking {arity} argument(s) on {target}")]
    NoSuchOperation {
        target: String,
        operation: String,
        arity: usize,
    },

    #[error("Invocation error: '{operation}' on {target} failed: {message}")]
    Failed {
        target: String,
        operation: String,
        message: String,
    },

    #[error("Invocation error: cannot call '{operation}' on non-capability value {found}")]
    NotCapability { operation: String, found: String },
}

/// A single row that failed to evaluate one of its join expressions.
#[derive(Debug)]
pub struct RowFailure {
    /// Index of the row's element in the `from` source
    pub row: usize,
    pub alias: String,
    pub error: Box<MqlError>,
}

/// Every row failure collected for one join group.
#[derive(Error, Debug)]
pub struct JoinError {
    pub failures: Vec<RowFailure>,
}

impl JoinError {
    pub fn new(mut failures: Vec<RowFailure>) -> Self {
        failures.sort_by(|a, b| a.row.cmp(&b.row).then_with(|| a.alias.cmp(&b.alias)));
        Self { failures }
    }

    /// The first failing row, in input order.
    pub fn first(&self) -> Option<&RowFailure> {
        self.failures.first()
    }
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Join error: {} row(s) failed", self.failures.len())?;
        for failure in &self.failures {
            write!(
                f,
                "; row {} as '{}': {}",
                failure.row, failure.alias, failure.error
            )?;
        }
        Ok(())
    }
}
