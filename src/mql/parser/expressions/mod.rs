//! Expression parsing methods for MQL.
//!
//! - `precedence`: Operator precedence chain (or → and → not → comparison → additive)
//! - `primary`: Primary expressions, property paths, capability calls

mod precedence;
mod primary;

use crate::error::MqlResult;
use crate::mql::ast::Expression;
use crate::mql::lexer::Token;
use crate::mql::parser::Parser;

impl Parser {
    /// Entry point for expression parsing
    pub(crate) fn parse_expression(&mut self) -> MqlResult<Expression> {
        self.parse_or_expression()
    }

    /// Parse call arguments: (arg1, arg2, ...)
    /// Assumes the opening '(' has already been consumed.
    pub(super) fn parse_function_call_args(&mut self) -> MqlResult<Vec<Expression>> {
        let mut args = Vec::new();

        while !matches!(self.current_token(), Token::RightParen | Token::Eof) {
            args.push(self.parse_expression()?);

            if matches!(self.current_token(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(Token::RightParen)?;
        Ok(args)
    }

    /// Convert a token to a field name if it can be used as one.
    /// Keywords are allowed after `.` and as projected field names.
    pub(crate) fn token_to_field_name(token: &Token) -> Option<String> {
        match token {
            Token::Identifier(name) => Some(name.clone()),
            Token::From => Some("from".to_string()),
            Token::As => Some("as".to_string()),
            Token::Join => Some("join".to_string()),
            Token::On => Some("on".to_string()),
            Token::Async => Some("async".to_string()),
            Token::Where => Some("where".to_string()),
            Token::Select => Some("select".to_string()),
            Token::New => Some("new".to_string()),
            Token::And => Some("and".to_string()),
            Token::Or => Some("or".to_string()),
            Token::Not => Some("not".to_string()),
            Token::True => Some("true".to_string()),
            Token::False => Some("false".to_string()),
            Token::Null => Some("null".to_string()),
            _ => None,
        }
    }
}
