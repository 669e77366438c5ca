//! Fluent construction of [`Query`] values.
//!
//! Builders accept either expression text, parsed with the same expression
//! parser the query parser uses, or ready-made [`Expression`] values. Text is
//! parsed in [`QueryBuilder::build`], which reports the first parse error.
//!
//! ```
//! use mql::builder::{lt, new_object, property, JoinBuilder, QueryBuilder};
//!
//! let built = QueryBuilder::new()
//!     .from("persons", "p")
//!     .join(JoinBuilder::expression("twitter.getUserInfo(p.twitterId)", "info"))
//!     .where_(lt(property("info.totalTweets"), 5))
//!     .select(new_object().set("name", "p.first + ' ' + p.last"))
//!     .build()
//!     .unwrap();
//!
//! let parsed = mql::parse(
//!     "from persons as p join twitter.getUserInfo(p.twitterId) as info \
//!      where info.totalTweets < 5 select new { name = p.first + ' ' + p.last }",
//! )
//! .unwrap();
//!
//! assert_eq!(built, parsed);
//! ```

use std::sync::Arc;

use super::ast::*;
use super::executor::TaskExecutor;
use super::parser::parse_expression;
use crate::error::{MqlError, MqlResult};

/// Expression given as text or as an AST.
#[derive(Debug, Clone)]
enum ExprSource {
    Text(String),
    Ast(Expression),
}

impl ExprSource {
    fn resolve(self) -> MqlResult<Expression> {
        match self {
            ExprSource::Text(text) => parse_expression(&text),
            ExprSource::Ast(expr) => Ok(expr),
        }
    }
}

#[derive(Debug, Clone)]
enum WhereSource {
    Text(String),
    Restriction(Restriction),
}

#[derive(Clone, Default)]
pub struct QueryBuilder {
    from: Option<FromClause>,
    joins: Vec<Vec<JoinBuilder>>,
    restriction: Option<WhereSource>,
    select: Option<SelectBuilder>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, source: impl Into<String>, alias: impl Into<String>) -> Self {
        self.from = Some(FromClause {
            source: source.into(),
            alias: alias.into(),
        });
        self
    }

    /// Add a join group with a single join.
    pub fn join(self, join: JoinBuilder) -> Self {
        self.join_group(vec![join])
    }

    /// Add a group of sibling joins sharing one guard gate.
    pub fn join_group(mut self, joins: Vec<JoinBuilder>) -> Self {
        self.joins.push(joins);
        self
    }

    pub fn where_(mut self, restriction: Restriction) -> Self {
        self.restriction = Some(WhereSource::Restriction(restriction));
        self
    }

    /// Restriction given as text, e.g. `info.totalTweets < 5`.
    pub fn where_text(mut self, text: impl Into<String>) -> Self {
        self.restriction = Some(WhereSource::Text(text.into()));
        self
    }

    pub fn select(mut self, select: SelectBuilder) -> Self {
        self.select = Some(select);
        self
    }

    pub fn build(self) -> MqlResult<Query> {
        let from = self
            .from
            .ok_or_else(|| MqlError::InvalidQuery("query has no 'from' clause".to_string()))?;
        let select = self
            .select
            .ok_or_else(|| MqlError::InvalidQuery("query has no 'select' clause".to_string()))?;

        let joins = self
            .joins
            .into_iter()
            .map(|group| {
                if group.is_empty() {
                    return Err(MqlError::InvalidQuery("empty join group".to_string()));
                }
                let specs = group
                    .into_iter()
                    .map(JoinBuilder::build)
                    .collect::<MqlResult<Vec<_>>>()?;
                Ok(JoinGroup::new(specs))
            })
            .collect::<MqlResult<Vec<_>>>()?;

        let restriction = match self.restriction {
            Some(WhereSource::Text(text)) => {
                Some(Restriction::from_expression(parse_expression(&text)?))
            }
            Some(WhereSource::Restriction(restriction)) => Some(restriction),
            None => None,
        };

        Ok(Query {
            from,
            joins,
            restriction,
            select: select.build()?,
        })
    }
}

/// One join: `expression as alias [on guard]`, optionally async.
#[derive(Clone)]
pub struct JoinBuilder {
    alias: String,
    expression: ExprSource,
    guard: Option<ExprSource>,
    is_async: bool,
    limit: Option<usize>,
    executor: Option<Arc<dyn TaskExecutor>>,
}

impl JoinBuilder {
    pub fn expression(text: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::with_source(ExprSource::Text(text.into()), alias.into())
    }

    pub fn from_expr(expression: Expression, alias: impl Into<String>) -> Self {
        Self::with_source(ExprSource::Ast(expression), alias.into())
    }

    fn with_source(expression: ExprSource, alias: String) -> Self {
        Self {
            alias,
            expression,
            guard: None,
            is_async: false,
            limit: None,
            executor: None,
        }
    }

    /// Guard; the row is dropped when it evaluates to null or false.
    pub fn on(mut self, text: impl Into<String>) -> Self {
        self.guard = Some(ExprSource::Text(text.into()));
        self
    }

    pub fn on_expr(mut self, guard: Expression) -> Self {
        self.guard = Some(ExprSource::Ast(guard));
        self
    }

    pub fn async_(mut self) -> Self {
        self.is_async = true;
        self
    }

    /// Bound in-flight tasks. Implies async.
    pub fn limit(mut self, limit: usize) -> Self {
        self.is_async = true;
        self.limit = Some(limit);
        self
    }

    /// Run tasks on `executor` instead of the engine pool. Implies async.
    pub fn executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.is_async = true;
        self.executor = Some(executor);
        self
    }

    fn build(self) -> MqlResult<JoinSpec> {
        if self.limit == Some(0) {
            return Err(MqlError::InvalidQuery(format!(
                "join '{}': concurrency limit must be positive",
                self.alias
            )));
        }

        let dispatch = if self.is_async {
            Dispatch::Async {
                limit: self.limit,
                executor: self.executor,
            }
        } else {
            Dispatch::Sync
        };

        Ok(JoinSpec {
            expression: Arc::new(self.expression.resolve()?),
            guard: self.guard.map(ExprSource::resolve).transpose()?.map(Arc::new),
            alias: self.alias,
            dispatch,
        })
    }
}

/// Start a `select new { ... }` projection.
pub fn new_object() -> SelectBuilder {
    SelectBuilder::default()
}

#[derive(Debug, Clone, Default)]
pub struct SelectBuilder {
    fields: Vec<(String, ExprSource)>,
}

impl SelectBuilder {
    pub fn set(mut self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.fields.push((field.into(), ExprSource::Text(text.into())));
        self
    }

    pub fn set_expr(mut self, field: impl Into<String>, expr: impl Into<Expression>) -> Self {
        self.fields.push((field.into(), ExprSource::Ast(expr.into())));
        self
    }

    fn build(self) -> MqlResult<ObjectBuilder> {
        self.fields
            .into_iter()
            .try_fold(ObjectBuilder::new(), |builder, (name, source)| {
                Ok(builder.field(name, source.resolve()?))
            })
    }
}

fn comparison(
    op: ComparisonOp,
    left: impl Into<Expression>,
    right: impl Into<Expression>,
) -> Restriction {
    Restriction::Comparison {
        op,
        left: left.into(),
        right: right.into(),
    }
}

pub fn lt(left: impl Into<Expression>, right: impl Into<Expression>) -> Restriction {
    comparison(ComparisonOp::Lt, left, right)
}

pub fn lte(left: impl Into<Expression>, right: impl Into<Expression>) -> Restriction {
    comparison(ComparisonOp::Lte, left, right)
}

pub fn gt(left: impl Into<Expression>, right: impl Into<Expression>) -> Restriction {
    comparison(ComparisonOp::Gt, left, right)
}

pub fn gte(left: impl Into<Expression>, right: impl Into<Expression>) -> Restriction {
    comparison(ComparisonOp::Gte, left, right)
}

pub fn eq(left: impl Into<Expression>, right: impl Into<Expression>) -> Restriction {
    comparison(ComparisonOp::Eq, left, right)
}

pub fn neq(left: impl Into<Expression>, right: impl Into<Expression>) -> Restriction {
    comparison(ComparisonOp::Neq, left, right)
}

pub fn and(left: Restriction, right: Restriction) -> Restriction {
    Restriction::And(Box::new(left), Box::new(right))
}

pub fn or(left: Restriction, right: Restriction) -> Restriction {
    Restriction::Or(Box::new(left), Box::new(right))
}

pub fn not(inner: Restriction) -> Restriction {
    Restriction::Not(Box::new(inner))
}

/// Bare expression in boolean position.
pub fn truth(expr: impl Into<Expression>) -> Restriction {
    Restriction::Truth(expr.into())
}

/// Property path from dotted text. `.?` or `?.` before a segment marks it
/// optional: `property("a.?b.c")`.
pub fn property(path: &str) -> Expression {
    let normalized = path.replace("?.", ".?");
    let mut parts = normalized.split('.');
    let base = Expression::variable(parts.next().unwrap_or_default());

    parts.fold(base, |expr, part| {
        let segment = match part.strip_prefix('?') {
            Some(name) => PathSegment::optional(name),
            None => PathSegment::new(part),
        };
        Expression::path_segment(expr, segment)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mql::executor::Task;
    use crate::mql::parser::parse;
    use crate::mql::value::Value;

    #[test]
    fn test_property_paths() {
        assert_eq!(property("p"), Expression::variable("p"));
        assert_eq!(property("a.?b.c"), parse_expression("a.?b.c").unwrap());
        assert_eq!(property("a?.b.c"), parse_expression("a.?b.c").unwrap());
    }

    #[test]
    fn test_builder_matches_parser_for_guarded_async_join() {
        let built = QueryBuilder::new()
            .from("persons", "p")
            .join(
                JoinBuilder::expression("twitter.getUserInfo(p.twitterId)", "twitterInfo")
                    .on("p.twitterId")
                    .limit(5),
            )
            .select(new_object().set("tweets", "twitterInfo.?totalTweets"))
            .build()
            .unwrap();

        let parsed = parse(
            "from persons as p \
             join twitter.getUserInfo(p.twitterId) as twitterInfo on p.twitterId async(5) \
             select new { tweets = twitterInfo.?totalTweets }",
        )
        .unwrap();

        assert_eq!(built, parsed);
    }

    #[test]
    fn test_builder_matches_parser_for_sibling_group() {
        let built = QueryBuilder::new()
            .from("persons", "p")
            .join_group(vec![
                JoinBuilder::expression("p.first", "a").async_(),
                JoinBuilder::expression("p.last", "b").async_(),
            ])
            .where_(and(
                neq(property("a"), Value::Null),
                not(truth(property("p.?retired"))),
            ))
            .select(new_object().set_expr("x", property("a")).set("y", "b"))
            .build()
            .unwrap();

        let parsed = parse(
            "from persons as p join p.first as a, p.last as b async \
             where a != null and not p.?retired select new { x = a, y = b }",
        )
        .unwrap();

        assert_eq!(built, parsed);
    }

    #[test]
    fn test_negative_literal_matches_parser() {
        let built = QueryBuilder::new()
            .from("items", "i")
            .where_(and(lt(property("i.n"), -1i64), gt(property("i.w"), -0.5)))
            .select(new_object().set_expr("n", property("i.n")))
            .build()
            .unwrap();

        let parsed =
            parse("from items as i where i.n < -1 and i.w > -0.5 select new { n = i.n }").unwrap();
        assert_eq!(built, parsed);

        for literal in [Expression::from(-1i64), Expression::from(-0.5)] {
            assert_eq!(parse_expression(&literal.to_string()).unwrap(), literal);
        }
    }

    #[test]
    fn test_where_text() {
        let built = QueryBuilder::new()
            .from("persons", "p")
            .where_text("p.age >= 18 or p.guardian")
            .select(new_object().set("n", "p.first"))
            .build()
            .unwrap();
        let expected = or(gte(property("p.age"), 18), truth(property("p.guardian")));
        assert_eq!(built.restriction, Some(expected));
    }

    #[test]
    fn test_build_reports_parse_errors() {
        let err = QueryBuilder::new()
            .from("persons", "p")
            .join(JoinBuilder::expression("twitter.(", "t"))
            .select(new_object().set("n", "p.first"))
            .build()
            .unwrap_err();
        assert!(matches!(err, MqlError::Parse { .. }));
    }

    #[test]
    fn test_build_requires_from_and_select() {
        let missing_select = QueryBuilder::new().from("persons", "p").build();
        assert!(matches!(missing_select, Err(MqlError::InvalidQuery(_))));

        let missing_from = QueryBuilder::new()
            .select(new_object().set("n", "1"))
            .build();
        assert!(matches!(missing_from, Err(MqlError::InvalidQuery(_))));

        let zero_limit = QueryBuilder::new()
            .from("persons", "p")
            .join(JoinBuilder::expression("p", "q").limit(0))
            .select(new_object().set("n", "1"))
            .build();
        assert!(matches!(zero_limit, Err(MqlError::InvalidQuery(_))));
    }

    #[test]
    fn test_executor_is_kept_by_identity() {
        let inline: Arc<dyn TaskExecutor> = Arc::new(|task: Task| task());
        let query = QueryBuilder::new()
            .from("persons", "p")
            .join(JoinBuilder::expression("p", "q").executor(Arc::clone(&inline)))
            .select(new_object().set("n", "q"))
            .build()
            .unwrap();

        match &query.joins[0].specs[0].dispatch {
            Dispatch::Async {
                limit: None,
                executor: Some(executor),
            } => assert!(Arc::ptr_eq(executor, &inline)),
            other => panic!("Expected async dispatch, got {:?}", other),
        }
    }

    #[test]
    fn test_builder_snapshots_are_independent() {
        let base = QueryBuilder::new()
            .from("persons", "p")
            .select(new_object().set("n", "p.first"));
        let with_where = base.clone().where_text("p.age > 1").build().unwrap();
        let plain = base.build().unwrap();

        assert!(with_where.restriction.is_some());
        assert!(plain.restriction.is_none());
    }
}
