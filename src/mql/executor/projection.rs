use super::evaluate::RowScope;
use crate::error::MqlResult;
use crate::mql::ast::ObjectBuilder;
use crate::mql::value::Object;

impl RowScope<'_> {
    /// Build one result object. Fields keep declaration order and a repeated
    /// name keeps its first position with the last value.
    pub fn project(&self, builder: &ObjectBuilder) -> MqlResult<Object> {
        let mut object = Object::with_capacity(builder.fields.len());
        for (name, expr) in &builder.fields {
            object.insert(name.clone(), self.evaluate(expr)?);
        }
        Ok(object)
    }
}
