pub mod ast;
pub mod builder;
pub mod capability;
pub mod context;
pub mod executor;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::*;
pub use builder::{JoinBuilder, QueryBuilder, SelectBuilder};
pub use capability::{Capability, OperationRegistry};
pub use context::{Context, ContextBuilder, Loader};
pub use executor::{execute, Engine, EngineConfig, Row, Task, TaskExecutor, WorkerPool};
pub use parser::{parse, parse_expression};
pub use value::{Object, Value};

impl Query {
    /// Start a fluent query.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}
