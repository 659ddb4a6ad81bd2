use std::fmt;

use reflex_types::Field;

/// Fields leading from the root struct to the current field, outermost first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path(Vec<Field>);

impl Path {
    /// Path extended by `field`
    pub fn child(&self, field: &Field) -> Path {
        let mut fields = self.0.clone();
        fields.push(field.clone());
        Path(fields)
    }

    /// Field descriptors of the path
    pub fn fields(&self) -> &[Field] {
        &self.0
    }

    /// The field the path ends with
    pub fn last(&self) -> Option<&Field> {
        self.0.last()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the path is empty (the root struct itself)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field names of the path
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(Field::name).collect()
    }

    /// Whether the path ends with the given names
    pub fn has_suffix(&self, names: &[&str]) -> bool {
        names.len() <= self.0.len()
            && self
                .0
                .iter()
                .rev()
                .zip(names.iter().rev())
                .all(|(field, name)| field.name() == *name)
    }

    /// Whether the field names are exactly `names`
    pub fn equal_names(&self, names: &[&str]) -> bool {
        names.len() == self.0.len() && self.0.iter().zip(names).all(|(field, name)| field.name() == *name)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join("."))
    }
}
