//! Column types

use crate::value::Value;

/// A named, ordered sequence of values
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Column {
    name: String,
    values: Vec<Value>,
}

impl Column {
    /// Create a new column
    pub fn new<S: Into<String>>(name: S, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Create a column from anything convertible into values
    pub fn from_values<S, I, V>(name: S, values: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(name, values.into_iter().map(Into::into).collect())
    }

    /// Column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the column
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// All values in row order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume the column, returning its values
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Value at a row (0-based)
    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the column has no rows
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over values in row order
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    /// Name of the most specific type shared by every non-null value
    ///
    /// Returns `"null"` for an all-null column and `"mixed"` when the
    /// non-null values disagree.
    pub fn inferred_type(&self) -> &'static str {
        let mut found: Option<&'static str> = None;
        for value in self.values.iter().filter(|v| !v.is_null()) {
            let name = value.type_name();
            match found {
                None => found = Some(name),
                Some(prev) if prev == name => {}
                Some("integer") if name == "float" => found = Some("float"),
                Some("float") if name == "integer" => {}
                Some(_) => return "mixed",
            }
        }
        found.unwrap_or("null")
    }
}

impl<'a> IntoIterator for &'a Column {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
