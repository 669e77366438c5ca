//! Primary expression parsing for MQL.
//!
//! Handles:
//! - Literals: integers, floats (optionally negated), strings, booleans, null
//! - Variables
//! - Parenthesized expressions
//! - Postfix operations: property access (.), null-safe access (.? and ?.),
//!   capability calls (target.operation(args))

use crate::error::MqlResult;
use crate::mql::ast::{Expression, PathSegment};
use crate::mql::lexer::Token;
use crate::mql::parser::Parser;
use crate::mql::value::Value;

impl Parser {
    /// Parse postfix expression: property paths and capability calls
    pub(super) fn parse_postfix_expression(&mut self) -> MqlResult<Expression> {
        let mut expr = self.parse_primary_expression()?;

        loop {
            let optional = match self.current_token() {
                Token::Dot => false,
                Token::DotQuestion | Token::QuestionDot => true,
                _ => break,
            };
            self.advance();

            let name = match Self::token_to_field_name(self.current_token()) {
                Some(name) => name,
                None => {
                    return Err(self.error(format!(
                        "Expected property name after '.', got {:?}",
                        self.current_token()
                    )))
                }
            };
            self.advance();

            if matches!(self.current_token(), Token::LeftParen) {
                if optional {
                    return Err(self.error(format!(
                        "Null-safe access cannot be used to call '{}'",
                        name
                    )));
                }
                self.advance(); // consume '('
                let args = self.parse_function_call_args()?;
                expr = Expression::call(expr, name, args);
            } else {
                let segment = if optional {
                    PathSegment::optional(name)
                } else {
                    PathSegment::new(name)
                };
                expr = Expression::path_segment(expr, segment);
            }
        }

        Ok(expr)
    }

    /// Parse primary expression (highest precedence)
    fn parse_primary_expression(&mut self) -> MqlResult<Expression> {
        let expr = match self.current_token() {
            Token::Identifier(name) => Expression::Variable(name.clone()),
            Token::Integer(n) => Expression::Literal(Value::Int(*n)),
            Token::Float(f) => Expression::Literal(Value::Float(*f)),
            Token::String(s) => Expression::Literal(Value::String(s.clone())),
            Token::True => Expression::Literal(Value::Bool(true)),
            Token::False => Expression::Literal(Value::Bool(false)),
            Token::Null => Expression::Literal(Value::Null),
            Token::Minus => {
                self.advance();
                return self.parse_negated_number();
            }
            Token::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(Token::RightParen)?;
                return Ok(inner);
            }
            Token::Eof => return Err(self.error("Unexpected end of input in expression")),
            other => {
                return Err(self.error(format!("Unexpected token in expression: {:?}", other)))
            }
        };
        self.advance();

        Ok(expr)
    }

    /// `- 5` with a space; `-5` is already a single token.
    fn parse_negated_number(&mut self) -> MqlResult<Expression> {
        let value = match self.current_token() {
            Token::Integer(n) => match n.checked_neg() {
                Some(n) => Value::Int(n),
                None => return Err(self.error(format!("Integer overflow negating {}", n))),
            },
            Token::Float(f) => Value::Float(-f),
            other => {
                return Err(self.error(format!(
                    "Unary minus applies only to number literals, got {:?}",
                    other
                )))
            }
        };
        self.advance();
        Ok(Expression::Literal(value))
    }
}
