//! Schema-less records.

use crate::value::Value;
use std::collections::BTreeMap;

/// A record: an open-ended mapping from field name to value.
///
/// Fields are kept ordered by name, so two records with the same
/// fields always encode identically. No shape is enforced; a table's
/// key path is just another field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns this record with `field` set to `value`.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Looks up a field. A missing field is `None`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Looks up a field, treating a missing field as `Null`.
    pub fn get_or_null(&self, field: &str) -> &Value {
        const NULL: &Value = &Value::Null;
        self.fields.get(field).unwrap_or(NULL)
    }

    /// Sets a field, returning the previous value if any.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Removes a field, returning its value if it was present.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Returns true if the record has `field`.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates over field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Shallow merge: a new record with every field of `self`, plus the
    /// fields of `other` whose names `self` does not have.
    ///
    /// Neither input is modified. On a name collision `self` wins.
    #[must_use]
    pub fn merged_with(&self, other: &Record) -> Record {
        let mut fields = self.fields.clone();
        for (name, value) in &other.fields {
            fields
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
        Record { fields }
    }

    /// A record holding every field name found on any of `records`,
    /// each set to `Null`. No records gives an empty record.
    #[must_use]
    pub fn null_shaped<'a>(records: impl IntoIterator<Item = &'a Record>) -> Record {
        let mut fields = BTreeMap::new();
        for record in records {
            for name in record.fields.keys() {
                if !fields.contains_key(name) {
                    fields.insert(name.clone(), Value::Null);
                }
            }
        }
        Record { fields }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
