//! Parser module for MQL query text.
//!
//! Converts tokenized input into the same [`Query`] AST the fluent builder
//! produces. Grammar:
//!
//! ```text
//! query      := "from" ident "as" ident joinGroup* ("where" restriction)? "select" "new" "{" fieldList "}"
//! joinGroup  := "join" joinItem ("," joinItem)* asyncMod?
//! joinItem   := expr "as" ident ("on" expr)?
//! asyncMod   := "async" ("(" integer ")")?
//! fieldList  := field ("," field)*
//! field      := ident "=" expr
//! ```

mod clauses;
mod expressions;

use super::ast::*;
use super::lexer::{Lexer, Spanned, Token};
use crate::error::{MqlError, MqlResult};

/// Parser for MQL queries
pub struct Parser {
    pub(crate) tokens: Vec<Spanned>,
    pub(crate) position: usize,
}

impl Parser {
    /// Create a new parser from an input string
    pub fn new(input: &str) -> MqlResult<Self> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Get the current token
    pub(crate) fn current_token(&self) -> &Token {
        self.tokens
            .get(self.position)
            .map(|s| &s.token)
            .unwrap_or(&Token::Eof)
    }

    /// Character offset of the current token
    pub(crate) fn current_position(&self) -> usize {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map(|s| s.position)
            .unwrap_or(0)
    }

    /// Advance to the next token
    pub(crate) fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    /// Parse error located at the current token
    pub(crate) fn error(&self, message: impl Into<String>) -> MqlError {
        MqlError::parse(self.current_position(), message)
    }

    /// Expect a specific token and advance, or return an error
    pub(crate) fn expect(&mut self, expected: Token) -> MqlResult<()> {
        if self.current_token() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "Expected {:?}, got {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    /// Expect an identifier and return its name
    pub(crate) fn expect_identifier(&mut self, what: &str) -> MqlResult<String> {
        match self.current_token() {
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("Expected {}, got {:?}", what, other))),
        }
    }

    /// Parse a complete query
    pub fn parse(&mut self) -> MqlResult<Query> {
        let from = self.parse_from_clause()?;

        let mut joins = Vec::new();
        while matches!(self.current_token(), Token::Join) {
            joins.push(self.parse_join_group()?);
        }

        let restriction = if matches!(self.current_token(), Token::Where) {
            Some(self.parse_where_clause()?)
        } else {
            None
        };

        let select = self.parse_select_clause()?;

        if !matches!(self.current_token(), Token::Eof) {
            return Err(self.error(format!(
                "Unexpected token after query: {:?}",
                self.current_token()
            )));
        }

        Ok(Query {
            from,
            joins,
            restriction,
            select,
        })
    }

    /// Parse a standalone expression, rejecting trailing tokens
    pub fn parse_standalone_expression(&mut self) -> MqlResult<Expression> {
        let expr = self.parse_expression()?;
        if !matches!(self.current_token(), Token::Eof) {
            return Err(self.error(format!(
                "Unexpected token after expression: {:?}",
                self.current_token()
            )));
        }
        Ok(expr)
    }
}

/// Parse query text into a [`Query`].
pub fn parse(input: &str) -> MqlResult<Query> {
    let mut parser = Parser::new(input)?;
    parser.parse()
}

/// Parse a single expression such as `twitter.getUserInfo(p.twitterId)`.
pub fn parse_expression(input: &str) -> MqlResult<Expression> {
    let mut parser = Parser::new(input)?;
    parser.parse_standalone_expression()
}
