use std::fmt;
use std::sync::Arc;

use super::executor::TaskExecutor;
use super::value::Value;

/// AST node for a complete MQL query
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub from: FromClause,
    /// Join groups, executed in declaration order
    pub joins: Vec<JoinGroup>,
    pub restriction: Option<Restriction>,
    pub select: ObjectBuilder,
}

/// from source as alias
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    /// Context variable holding the source collection
    pub source: String,
    pub alias: String,
}

/// Sibling joins sharing one guard gate and one barrier.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinGroup {
    pub specs: Vec<JoinSpec>,
}

impl JoinGroup {
    pub fn new(specs: Vec<JoinSpec>) -> Self {
        Self { specs }
    }

    pub fn is_async(&self) -> bool {
        self.specs.iter().any(|s| s.dispatch.is_async())
    }

    /// Smallest concurrency limit declared by an async sibling.
    pub fn concurrency_limit(&self) -> Option<usize> {
        self.specs
            .iter()
            .filter_map(|s| match &s.dispatch {
                Dispatch::Async { limit, .. } => *limit,
                Dispatch::Sync => None,
            })
            .min()
    }
}

/// join expression as alias [on guard]
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    pub alias: String,
    pub expression: Arc<Expression>,
    pub guard: Option<Arc<Expression>>,
    pub dispatch: Dispatch,
}

/// How a join expression is evaluated for each row.
#[derive(Clone, Default)]
pub enum Dispatch {
    /// Inline on the calling thread
    #[default]
    Sync,
    /// One task per row on a worker pool
    Async {
        limit: Option<usize>,
        /// Caller-supplied executor; the engine's default pool when absent
        executor: Option<Arc<dyn TaskExecutor>>,
    },
}

impl Dispatch {
    pub fn is_async(&self) -> bool {
        matches!(self, Dispatch::Async { .. })
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatch::Sync => write!(f, "Sync"),
            Dispatch::Async { limit, executor } => f
                .debug_struct("Async")
                .field("limit", limit)
                .field("custom_executor", &executor.is_some())
                .finish(),
        }
    }
}

/// Executors compare by identity.
impl PartialEq for Dispatch {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Dispatch::Sync, Dispatch::Sync) => true,
            (
                Dispatch::Async {
                    limit: l1,
                    executor: e1,
                },
                Dispatch::Async {
                    limit: l2,
                    executor: e2,
                },
            ) => {
                l1 == l2
                    && match (e1, e2) {
                        (None, None) => true,
                        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                        _ => false,
                    }
            }
            _ => false,
        }
    }
}

/// One segment of a property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String,
    /// `.?name`: a null here short-circuits the rest of the path to null
    pub optional: bool,
}

impl PathSegment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),

    /// Row alias or context variable
    Variable(String),

    PropertyPath {
        base: Box<Expression>,
        segments: Vec<PathSegment>,
    },

    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    Logical(LogicalOp),

    /// target.operation(args...)
    FunctionCall {
        target: Box<Expression>,
        operation: String,
        args: Vec<Expression>,
    },
}

impl Expression {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    /// Extend `base` with one more segment, flattening nested paths.
    pub fn path_segment(base: Expression, segment: PathSegment) -> Self {
        match base {
            Expression::PropertyPath { base, mut segments } => {
                segments.push(segment);
                Expression::PropertyPath { base, segments }
            }
            other => Expression::PropertyPath {
                base: Box::new(other),
                segments: vec![segment],
            },
        }
    }

    pub fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Self {
        Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn call(target: Expression, operation: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::FunctionCall {
            target: Box::new(target),
            operation: operation.into(),
            args,
        }
    }
}

/// Renders query-text form, used in error messages.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(Value::String(s)) => write!(f, "{:?}", s),
            Expression::Literal(Value::Float(x)) => write!(f, "{:?}", x),
            Expression::Literal(value) => write!(f, "{}", value),
            Expression::Variable(name) => f.write_str(name),
            Expression::PropertyPath { base, segments } => {
                fmt_operand(base, f)?;
                for segment in segments {
                    let sep = if segment.optional { ".?" } else { "." };
                    write!(f, "{}{}", sep, segment.name)?;
                }
                Ok(())
            }
            Expression::BinaryOp { left, op, right } => {
                fmt_operand(left, f)?;
                let symbol = match op {
                    BinaryOperator::Add => "+",
                    BinaryOperator::Compare(cmp) => cmp.symbol(),
                };
                write!(f, " {} ", symbol)?;
                fmt_operand(right, f)
            }
            Expression::Logical(LogicalOp::And(l, r)) => {
                fmt_operand(l, f)?;
                f.write_str(" and ")?;
                fmt_operand(r, f)
            }
            Expression::Logical(LogicalOp::Or(l, r)) => {
                fmt_operand(l, f)?;
                f.write_str(" or ")?;
                fmt_operand(r, f)
            }
            Expression::Logical(LogicalOp::Not(inner)) => {
                f.write_str("not ")?;
                fmt_operand(inner, f)
            }
            Expression::FunctionCall {
                target,
                operation,
                args,
            } => {
                fmt_operand(target, f)?;
                write!(f, ".{}(", operation)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

fn fmt_operand(expr: &Expression, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match expr {
        Expression::BinaryOp { .. } | Expression::Logical(_) => write!(f, "({})", expr),
        _ => write!(f, "{}", expr),
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Literal(value)
    }
}

impl From<i64> for Expression {
    fn from(i: i64) -> Self {
        Expression::Literal(Value::Int(i))
    }
}

impl From<i32> for Expression {
    fn from(i: i32) -> Self {
        Expression::Literal(Value::from(i))
    }
}

impl From<f64> for Expression {
    fn from(x: f64) -> Self {
        Expression::Literal(Value::Float(x))
    }
}

impl From<bool> for Expression {
    fn from(b: bool) -> Self {
        Expression::Literal(Value::Bool(b))
    }
}

/// String literal. Use `property` or `parse_expression` for paths.
impl From<&str> for Expression {
    fn from(s: &str) -> Self {
        Expression::Literal(Value::from(s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Compare(ComparisonOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Neq,
}

impl ComparisonOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Lt => "<",
            ComparisonOp::Lte => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Gte => ">=",
            ComparisonOp::Eq => "==",
            ComparisonOp::Neq => "!=",
        }
    }

    pub fn is_ordering(&self) -> bool {
        !matches!(self, ComparisonOp::Eq | ComparisonOp::Neq)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogicalOp {
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
}

/// Boolean predicate tree for the `where` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Restriction {
    Comparison {
        op: ComparisonOp,
        left: Expression,
        right: Expression,
    },
    And(Box<Restriction>, Box<Restriction>),
    Or(Box<Restriction>, Box<Restriction>),
    Not(Box<Restriction>),
    /// Bare expression in boolean position
    Truth(Expression),
}

impl Restriction {
    /// Lower a parsed boolean expression into a restriction tree.
    pub fn from_expression(expr: Expression) -> Self {
        match expr {
            Expression::Logical(LogicalOp::And(l, r)) => Restriction::And(
                Box::new(Self::from_expression(*l)),
                Box::new(Self::from_expression(*r)),
            ),
            Expression::Logical(LogicalOp::Or(l, r)) => Restriction::Or(
                Box::new(Self::from_expression(*l)),
                Box::new(Self::from_expression(*r)),
            ),
            Expression::Logical(LogicalOp::Not(inner)) => {
                Restriction::Not(Box::new(Self::from_expression(*inner)))
            }
            Expression::BinaryOp {
                left,
                op: BinaryOperator::Compare(op),
                right,
            } => Restriction::Comparison {
                op,
                left: *left,
                right: *right,
            },
            other => Restriction::Truth(other),
        }
    }
}

/// `select new { field = expr, ... }`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectBuilder {
    pub fields: Vec<(String, Expression)>,
}

impl ObjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, expr: Expression) -> Self {
        self.fields.push((name.into(), expr));
        self
    }
}
