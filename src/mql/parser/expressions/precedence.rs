//! Operator precedence chain for MQL expression parsing.
//!
//! Precedence (lowest to highest):
//! 1. Boolean OR: `or`
//! 2. Boolean AND: `and`
//! 3. Negation: `not`
//! 4. Comparison: `==`, `!=`, `<`, `<=`, `>`, `>=` (non-associative)
//! 5. Additive: `+`
//! 6. Postfix: `.`, `.?`, `?.`, calls
//! 7. Primary: literals, variables, parenthesised expressions

use crate::error::MqlResult;
use crate::mql::ast::{BinaryOperator, ComparisonOp, Expression, LogicalOp};
use crate::mql::lexer::Token;
use crate::mql::parser::Parser;

impl Parser {
    pub(super) fn parse_or_expression(&mut self) -> MqlResult<Expression> {
        let mut left = self.parse_and_expression()?;

        while matches!(self.current_token(), Token::Or) {
            self.advance();
            let right = self.parse_and_expression()?;
            left = Expression::Logical(LogicalOp::Or(Box::new(left), Box::new(right)));
        }

        Ok(left)
    }

    fn parse_and_expression(&mut self) -> MqlResult<Expression> {
        let mut left = self.parse_not_expression()?;

        while matches!(self.current_token(), Token::And) {
            self.advance();
            let right = self.parse_not_expression()?;
            left = Expression::Logical(LogicalOp::And(Box::new(left), Box::new(right)));
        }

        Ok(left)
    }

    fn parse_not_expression(&mut self) -> MqlResult<Expression> {
        if matches!(self.current_token(), Token::Not) {
            self.advance();
            let operand = self.parse_not_expression()?;
            return Ok(Expression::Logical(LogicalOp::Not(Box::new(operand))));
        }

        self.parse_comparison_expression()
    }

    fn parse_comparison_expression(&mut self) -> MqlResult<Expression> {
        let left = self.parse_additive_expression()?;

        let op = match self.current_token() {
            Token::Equal => ComparisonOp::Eq,
            Token::NotEqual => ComparisonOp::Neq,
            Token::LessThan => ComparisonOp::Lt,
            Token::LessThanEq => ComparisonOp::Lte,
            Token::GreaterThan => ComparisonOp::Gt,
            Token::GreaterThanEq => ComparisonOp::Gte,
            _ => return Ok(left),
        };
        self.advance();

        let right = self.parse_additive_expression()?;
        Ok(Expression::binary(left, BinaryOperator::Compare(op), right))
    }

    fn parse_additive_expression(&mut self) -> MqlResult<Expression> {
        let mut left = self.parse_postfix_expression()?;

        while matches!(self.current_token(), Token::Plus) {
            self.advance();
            let right = self.parse_postfix_expression()?;
            left = Expression::binary(left, BinaryOperator::Add, right);
        }

        Ok(left)
    }
}
