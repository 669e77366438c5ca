use super::evaluate::RowScope;
use super::helpers::compare_values;
use crate::error::MqlResult;
use crate::mql::ast::Restriction;

impl RowScope<'_> {
    /// Evaluate a `where` predicate. `and`/`or` short-circuit left to right.
    pub fn satisfies(&self, restriction: &Restriction) -> MqlResult<bool> {
        match restriction {
            Restriction::Comparison { op, left, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                compare_values(*op, &left, &right)
            }
            Restriction::And(left, right) => Ok(self.satisfies(left)? && self.satisfies(right)?),
            Restriction::Or(left, right) => Ok(self.satisfies(left)? || self.satisfies(right)?),
            Restriction::Not(inner) => Ok(!self.satisfies(inner)?),
            Restriction::Truth(expr) => self.evaluate_bool(expr),
        }
    }
}
