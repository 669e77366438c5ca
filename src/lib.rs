pub mod error;
pub mod mql;
pub mod service;

pub use error::{InvocationError, JoinError, MqlError, MqlResult, RowFailure};
pub use mql::builder;
pub use mql::{
    execute, parse, parse_expression, Capability, Context, ContextBuilder, Engine, EngineConfig,
    Expression, JoinBuilder, Loader, Object, OperationRegistry, Query, QueryBuilder, Restriction,
    Task, TaskExecutor, Value,
};
