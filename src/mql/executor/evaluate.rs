//! Row-scoped expression evaluation.
//!
//! Names resolve against the row's aliases first, then the context.

use std::panic::{self, AssertUnwindSafe};

use super::helpers::{add_values, compare_values, to_bool};
use super::types::Row;
use crate::error::{InvocationError, MqlError, MqlResult};
use crate::mql::ast::*;
use crate::mql::capability::{getter_name, Capability};
use crate::mql::context::Context;
use crate::mql::value::Value;

/// Evaluation scope for one row.
pub struct RowScope<'a> {
    row: &'a Row,
    context: &'a Context,
}

impl<'a> RowScope<'a> {
    pub fn new(row: &'a Row, context: &'a Context) -> Self {
        Self { row, context }
    }

    pub fn row(&self) -> &Row {
        self.row
    }

    pub fn evaluate(&self, expr: &Expression) -> MqlResult<Value> {
        match expr {
            Expression::Literal(value) => Ok(value.clone()),

            Expression::Variable(name) => self.lookup(name),

            Expression::PropertyPath { base, segments } => self.evaluate_path(base, segments),

            Expression::BinaryOp { left, op, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                match op {
                    BinaryOperator::Add => add_values(&left, &right),
                    BinaryOperator::Compare(cmp) => {
                        compare_values(*cmp, &left, &right).map(Value::Bool)
                    }
                }
            }

            Expression::Logical(logical) => self.evaluate_logical(logical).map(Value::Bool),

            Expression::FunctionCall {
                target,
                operation,
                args,
            } => self.evaluate_call(target, operation, args),
        }
    }

    /// Evaluate in boolean position.
    pub fn evaluate_bool(&self, expr: &Expression) -> MqlResult<bool> {
        to_bool(&self.evaluate(expr)?)
    }

    fn lookup(&self, name: &str) -> MqlResult<Value> {
        if let Some(value) = self.row.get(name) {
            return Ok(value.clone());
        }
        self.context
            .get(name)
            .ok_or_else(|| MqlError::UnresolvedVariable(format!("'{}' is not defined", name)))
    }

    fn evaluate_logical(&self, logical: &LogicalOp) -> MqlResult<bool> {
        match logical {
            LogicalOp::And(left, right) => {
                Ok(self.evaluate_bool(left)? && self.evaluate_bool(right)?)
            }
            LogicalOp::Or(left, right) => {
                Ok(self.evaluate_bool(left)? || self.evaluate_bool(right)?)
            }
            LogicalOp::Not(inner) => Ok(!self.evaluate_bool(inner)?),
        }
    }

    fn evaluate_path(&self, base: &Expression, segments: &[PathSegment]) -> MqlResult<Value> {
        let mut current = self.evaluate(base)?;

        for (i, segment) in segments.iter().enumerate() {
            if current.is_null() {
                if segment.optional {
                    return Ok(Value::Null);
                }
                return Err(MqlError::UnresolvedVariable(format!(
                    "cannot read '{}' of null '{}'",
                    segment.name,
                    walked_path(base, &segments[..i])
                )));
            }

            current = self.property(&current, &segment.name, || {
                walked_path(base, &segments[..i])
            })?;

            if segment.optional && current.is_null() {
                return Ok(Value::Null);
            }
        }

        Ok(current)
    }

    /// Missing object fields read as null; scalars have no properties.
    fn property(
        &self,
        value: &Value,
        name: &str,
        walked: impl Fn() -> String,
    ) -> MqlResult<Value> {
        match value {
            Value::Object(obj) => Ok(obj.get(name).cloned().unwrap_or(Value::Null)),
            Value::Capability(cap) => {
                let getter = getter_name(name);
                let operation = if cap.has_operation(name, 0) {
                    name
                } else if cap.has_operation(&getter, 0) {
                    getter.as_str()
                } else {
                    return Err(MqlError::UnresolvedVariable(format!(
                        "{} '{}' has no property '{}'",
                        cap.type_name(),
                        walked(),
                        name
                    )));
                };
                invoke(cap.as_ref(), operation, &[])
            }
            other => Err(MqlError::UnresolvedVariable(format!(
                "{} '{}' has no property '{}'",
                other.type_name(),
                walked(),
                name
            ))),
        }
    }

    fn evaluate_call(
        &self,
        target: &Expression,
        operation: &str,
        args: &[Expression],
    ) -> MqlResult<Value> {
        let capability = match self.evaluate(target)? {
            Value::Capability(cap) => cap,
            other => {
                return Err(InvocationError::NotCapability {
                    operation: operation.to_string(),
                    found: other.type_name().to_string(),
                }
                .into())
            }
        };

        if !capability.has_operation(operation, args.len()) {
            return Err(InvocationError::NoSuchOperation {
                target: capability.type_name().to_string(),
                operation: operation.to_string(),
                arity: args.len(),
            }
            .into());
        }

        let args = args
            .iter()
            .map(|arg| self.evaluate(arg))
            .collect::<MqlResult<Vec<_>>>()?;

        invoke(capability.as_ref(), operation, &args)
    }
}

/// Render `base` plus the segments read so far, for error messages.
fn walked_path(base: &Expression, segments: &[PathSegment]) -> String {
    let mut walked = base.to_string();
    for segment in segments {
        walked.push_str(if segment.optional { ".?" } else { "." });
        walked.push_str(&segment.name);
    }
    walked
}

/// Invoke a host operation, turning host errors and panics into
/// `InvocationError::Failed`.
fn invoke(capability: &dyn Capability, operation: &str, args: &[Value]) -> MqlResult<Value> {
    let failed = |message: String| InvocationError::Failed {
        target: capability.type_name().to_string(),
        operation: operation.to_string(),
        message,
    };

    match panic::catch_unwind(AssertUnwindSafe(|| capability.invoke(operation, args))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(failed(format!("{:#}", e)).into()),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "operation panicked".to_string());
            Err(failed(format!("panicked: {}", message)).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mql::capability::OperationRegistry;
    use crate::mql::parser::parse_expression;
    use crate::mql::value::Object;

    fn context() -> Context {
        let twitter = OperationRegistry::new("twitter")
            .operation("getUserInfo", 1, |args| match args[0].as_str() {
                Some("joeschmoe") => Ok(Object::new().with("totalTweets", 4).into()),
                Some(other) => anyhow::bail!("unknown user {}", other),
                None => Ok(Value::Null),
            })
            .operation("getHandle", 0, |_| Ok(Value::from("@twitter")))
            .operation("explode", 0, |_| panic!("boom"));
        Context::builder()
            .capability("twitter", twitter)
            .value("limit", 5)
            .build()
    }

    fn row() -> Row {
        let person = Object::new()
            .with("first", "Joe")
            .with("last", "Schmoe")
            .with("twitterId", "joeschmoe")
            .with("manager", Value::Null)
            .with("address", Object::new().with("city", "Paris"));
        Row::new(0, "p", person.into())
    }

    fn eval(text: &str) -> MqlResult<Value> {
        let ctx = context();
        let row = row();
        RowScope::new(&row, &ctx).evaluate(&parse_expression(text).unwrap())
    }

    #[test]
    fn test_variables_resolve_row_then_context() {
        assert!(matches!(eval("p").unwrap(), Value::Object(_)));
        assert_eq!(eval("limit").unwrap(), Value::Int(5));
        assert!(matches!(eval("nobody"), Err(MqlError::UnresolvedVariable(_))));
    }

    #[test]
    fn test_property_paths() {
        assert_eq!(eval("p.address.city").unwrap(), Value::from("Paris"));
        assert_eq!(eval("p.nickname").unwrap(), Value::Null);
    }

    #[test]
    fn test_non_optional_segment_on_null_fails() {
        let err = eval("p.manager.name").unwrap_err();
        match err {
            MqlError::UnresolvedVariable(msg) => assert!(msg.contains("p.manager")),
            other => panic!("Expected UnresolvedVariable, got {:?}", other),
        }
    }

    #[test]
    fn test_optional_segment_short_circuits() {
        assert_eq!(eval("p.?manager.name").unwrap(), Value::Null);
        assert_eq!(eval("p.manager?.name").unwrap(), Value::Null);
        assert_eq!(eval("p.?address.city").unwrap(), Value::from("Paris"));
    }

    #[test]
    fn test_property_on_scalar_fails() {
        assert!(matches!(
            eval("p.first.length"),
            Err(MqlError::UnresolvedVariable(_))
        ));

        match eval("p.?address.city.zip").unwrap_err() {
            MqlError::UnresolvedVariable(msg) => {
                assert!(msg.contains("'p.?address.city'"));
                assert!(msg.contains("'zip'"));
            }
            other => panic!("Expected UnresolvedVariable, got {:?}", other),
        }
    }

    #[test]
    fn test_capability_call() {
        let info = eval("twitter.getUserInfo(p.twitterId)").unwrap();
        assert_eq!(info.get("totalTweets"), Some(&Value::Int(4)));
        assert_eq!(
            eval("twitter.getUserInfo(p.twitterId).totalTweets").unwrap(),
            Value::Int(4)
        );
    }

    #[test]
    fn test_capability_getter_property() {
        assert_eq!(eval("twitter.handle").unwrap(), Value::from("@twitter"));
        assert_eq!(eval("twitter.getHandle()").unwrap(), Value::from("@twitter"));
        assert!(matches!(
            eval("twitter.followers"),
            Err(MqlError::UnresolvedVariable(_))
        ));
    }

    #[test]
    fn test_no_such_operation() {
        let err = eval("twitter.getUserInfo(1, 2)").unwrap_err();
        assert!(matches!(
            err,
            MqlError::Invocation(InvocationError::NoSuchOperation { arity: 2, .. })
        ));
    }

    #[test]
    fn test_host_failure_wrapped() {
        let err = eval("twitter.getUserInfo('nobody')").unwrap_err();
        match err {
            MqlError::Invocation(InvocationError::Failed { message, .. }) => {
                assert!(message.contains("unknown user nobody"))
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_host_panic_wrapped() {
        let err = eval("twitter.explode()").unwrap_err();
        match err {
            MqlError::Invocation(InvocationError::Failed { message, .. }) => {
                assert!(message.contains("boom"))
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_call_on_non_capability() {
        assert!(matches!(
            eval("p.first.toUpperCase()"),
            Err(MqlError::Invocation(InvocationError::NotCapability { .. }))
        ));
    }

    #[test]
    fn test_concatenation_and_sum() {
        assert_eq!(
            eval("p.first + ' ' + p.last").unwrap(),
            Value::from("Joe Schmoe")
        );
        assert_eq!(eval("limit + 2.5").unwrap(), Value::Float(7.5));
        assert!(matches!(eval("limit + true"), Err(MqlError::TypeMismatch(_))));
    }

    #[test]
    fn test_logical_short_circuit() {
        // right side would fail with UnresolvedVariable if evaluated
        assert_eq!(eval("false and p.manager.name").unwrap(), Value::Bool(false));
        assert_eq!(eval("true or p.manager.name").unwrap(), Value::Bool(true));
        assert_eq!(eval("not p.?manager").unwrap(), Value::Bool(true));
        assert!(matches!(eval("p.first and true"), Err(MqlError::TypeMismatch(_))));
    }

    #[test]
    fn test_comparison_expression() {
        assert_eq!(eval("limit >= 5").unwrap(), Value::Bool(true));
        assert_eq!(eval("p.manager == null").unwrap(), Value::Bool(true));
        assert!(matches!(eval("p.manager < 3"), Err(MqlError::TypeMismatch(_))));
    }
}
