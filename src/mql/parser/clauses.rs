//! Clause parsing: from, join groups, where, select.

use std::sync::Arc;

use super::Parser;
use crate::error::MqlResult;
use crate::mql::ast::*;
use crate::mql::lexer::Token;

impl Parser {
    /// from source as alias
    pub(super) fn parse_from_clause(&mut self) -> MqlResult<FromClause> {
        self.expect(Token::From)?;
        let source = self.expect_identifier("source variable after 'from'")?;
        self.expect(Token::As)?;
        let alias = self.expect_identifier("alias after 'as'")?;

        Ok(FromClause { source, alias })
    }

    /// join item (, item)* [async [(n)]]
    pub(super) fn parse_join_group(&mut self) -> MqlResult<JoinGroup> {
        self.expect(Token::Join)?;

        let mut items = vec![self.parse_join_item()?];
        while matches!(self.current_token(), Token::Comma) {
            self.advance();
            items.push(self.parse_join_item()?);
        }

        let dispatch = if matches!(self.current_token(), Token::Async) {
            self.advance();
            let limit = self.parse_async_limit()?;
            Dispatch::Async {
                limit,
                executor: None,
            }
        } else {
            Dispatch::Sync
        };

        let specs = items
            .into_iter()
            .map(|(alias, expression, guard)| JoinSpec {
                alias,
                expression: Arc::new(expression),
                guard: guard.map(Arc::new),
                dispatch: dispatch.clone(),
            })
            .collect();

        Ok(JoinGroup::new(specs))
    }

    fn parse_join_item(&mut self) -> MqlResult<(String, Expression, Option<Expression>)> {
        let expression = self.parse_expression()?;
        self.expect(Token::As)?;
        let alias = self.expect_identifier("join alias after 'as'")?;

        let guard = if matches!(self.current_token(), Token::On) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok((alias, expression, guard))
    }

    /// Optional `(n)` after `async`
    fn parse_async_limit(&mut self) -> MqlResult<Option<usize>> {
        if !matches!(self.current_token(), Token::LeftParen) {
            return Ok(None);
        }
        self.advance();

        let limit = match self.current_token() {
            Token::Integer(n) if *n > 0 => *n as usize,
            other => {
                return Err(self.error(format!(
                    "Expected positive integer concurrency limit, got {:?}",
                    other
                )))
            }
        };
        self.advance();
        self.expect(Token::RightParen)?;

        Ok(Some(limit))
    }

    pub(super) fn parse_where_clause(&mut self) -> MqlResult<Restriction> {
        self.expect(Token::Where)?;
        let expr = self.parse_expression()?;
        Ok(Restriction::from_expression(expr))
    }

    /// select new { field = expr, ... }
    pub(super) fn parse_select_clause(&mut self) -> MqlResult<ObjectBuilder> {
        self.expect(Token::Select)?;
        self.expect(Token::New)?;
        self.expect(Token::LeftBrace)?;

        let mut fields = Vec::new();
        loop {
            let name = match Self::token_to_field_name(self.current_token()) {
                Some(name) => name,
                None => {
                    return Err(self.error(format!(
                        "Expected field name, got {:?}",
                        self.current_token()
                    )))
                }
            };
            self.advance();
            self.expect(Token::Assign)?;
            let expr = self.parse_expression()?;
            fields.push((name, expr));

            if matches!(self.current_token(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(Token::RightBrace)?;
        Ok(ObjectBuilder { fields })
    }
}
