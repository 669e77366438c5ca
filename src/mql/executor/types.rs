use crate::mql::value::Value;

/// Alias bindings accumulated for one source element.
///
/// A row starts with the `from` binding and gains one binding per join.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Position of the originating element in the `from` source
    source_index: usize,
    bindings: Vec<(String, Value)>,
}

impl Row {
    pub fn new(source_index: usize, alias: impl Into<String>, value: Value) -> Self {
        Self {
            source_index,
            bindings: vec![(alias.into(), value)],
        }
    }

    pub fn source_index(&self) -> usize {
        self.source_index
    }

    pub fn get(&self, alias: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .rev()
            .find(|(name, _)| name == alias)
            .map(|(_, value)| value)
    }

    /// Add a binding; a repeated alias shadows the earlier one.
    pub fn bind(&mut self, alias: impl Into<String>, value: Value) {
        self.bindings.push((alias.into(), value));
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(name, _)| name.as_str())
    }
}
