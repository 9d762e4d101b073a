use crate::core::Value;
use std::fmt;

/// Fully resolved entity identifier: identifier field names paired with
/// their values, in the order the metadata declares them.
///
/// A partially populated identifier is never constructed by the accessor
/// layer; absence is expressed as `Option<Identifier>::None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    parts: Vec<(String, Value)>,
}

impl Identifier {
    pub fn new() -> Self {
        Self { parts: Vec::new() }
    }

    /// Single-column identifier, the common case.
    pub fn single(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            parts: vec![(field.into(), value.into())],
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(field, value);
        self
    }

    /// Appends a component, replacing an earlier one with the same name.
    pub fn push(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        match self.parts.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.parts.push((field, value)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.parts
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// First component in declared order.
    pub fn first(&self) -> Option<&Value> {
        self.parts.first().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.parts.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.parts.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl Default for Identifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (idx, (name, value)) in self.parts.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        write!(f, "}}")
    }
}

impl<'a> IntoIterator for &'a Identifier {
    type Item = (&'a str, &'a Value);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a Value)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
