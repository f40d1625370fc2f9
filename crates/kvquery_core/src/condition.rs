//! Condition evaluation.
//!
//! A [`Condition`] maps field names to either a literal (strict
//! equality) or an [`OperatorSet`]. Every field must match, and every
//! operator within a field must pass.
//!
//! A field missing from the record is compared as `Null`, so
//! `{manager: null}` and `{manager: {ne: 5}}` match it while any
//! ordering operator fails.

use kvquery_codec::{CodecError, CodecResult, Record, Value};
use serde_json::Value as Json;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Comparison operators applied to one field. All present operators
/// must pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorSet {
    /// Field equals the operand.
    pub eq: Option<Value>,
    /// Field is greater than the operand.
    pub gt: Option<Value>,
    /// Field is greater than or equal to the operand.
    pub gte: Option<Value>,
    /// Field is less than the operand.
    pub lt: Option<Value>,
    /// Field is less than or equal to the operand.
    pub lte: Option<Value>,
    /// Field differs from the operand.
    pub ne: Option<Value>,
}

impl OperatorSet {
    /// An empty set, which passes every value.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `eq`.
    #[must_use]
    pub fn eq(mut self, operand: impl Into<Value>) -> Self {
        self.eq = Some(operand.into());
        self
    }

    /// Adds `gt`.
    #[must_use]
    pub fn gt(mut self, operand: impl Into<Value>) -> Self {
        self.gt = Some(operand.into());
        self
    }

    /// Adds `gte`.
    #[must_use]
    pub fn gte(mut self, operand: impl Into<Value>) -> Self {
        self.gte = Some(operand.into());
        self
    }

    /// Adds `lt`.
    #[must_use]
    pub fn lt(mut self, operand: impl Into<Value>) -> Self {
        self.lt = Some(operand.into());
        self
    }

    /// Adds `lte`.
    #[must_use]
    pub fn lte(mut self, operand: impl Into<Value>) -> Self {
        self.lte = Some(operand.into());
        self
    }

    /// Adds `ne`.
    #[must_use]
    pub fn ne(mut self, operand: impl Into<Value>) -> Self {
        self.ne = Some(operand.into());
        self
    }

    /// Tests `value` against every present operator.
    pub fn matches(&self, value: &Value) -> bool {
        let ordered = |operand: &Option<Value>, accept: fn(Ordering) -> bool| {
            operand
                .as_ref()
                .map_or(true, |operand| value.compare(operand).is_some_and(accept))
        };

        self.eq.as_ref().map_or(true, |operand| value == operand)
            && self.ne.as_ref().map_or(true, |operand| value != operand)
            && ordered(&self.gt, Ordering::is_gt)
            && ordered(&self.gte, Ordering::is_ge)
            && ordered(&self.lt, Ordering::is_lt)
            && ordered(&self.lte, Ordering::is_le)
    }

    fn from_json_object(object: serde_json::Map<String, Json>) -> CodecResult<Self> {
        let mut set = Self::new();
        for (op, operand) in object {
            let operand = Some(Value::from_json(operand)?);
            match op.as_str() {
                "eq" => set.eq = operand,
                "gt" => set.gt = operand,
                "gte" => set.gte = operand,
                "lt" => set.lt = operand,
                "lte" => set.lte = operand,
                "ne" => set.ne = operand,
                other => {
                    return Err(CodecError::invalid_structure(format!(
                        "unknown operator: {other}"
                    )))
                }
            }
        }
        Ok(set)
    }
}

/// What one field must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldCondition {
    /// Strict, type-sensitive equality.
    Equals(Value),
    /// Every operator in the set must pass.
    Ops(OperatorSet),
}

impl FieldCondition {
    /// Tests a field value (`Null` when the field is missing).
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldCondition::Equals(expected) => value == expected,
            FieldCondition::Ops(ops) => ops.matches(value),
        }
    }
}

impl From<OperatorSet> for FieldCondition {
    fn from(ops: OperatorSet) -> Self {
        FieldCondition::Ops(ops)
    }
}

/// A conjunction of per-field conditions. An empty condition matches
/// every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Condition {
    fields: BTreeMap<String, FieldCondition>,
}

impl Condition {
    /// An empty condition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires `field` to equal `value`.
    #[must_use]
    pub fn equals(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields
            .insert(field.into(), FieldCondition::Equals(value.into()));
        self
    }

    /// Requires `field` to pass every operator in `ops`.
    #[must_use]
    pub fn with_ops(mut self, field: impl Into<String>, ops: OperatorSet) -> Self {
        self.fields.insert(field.into(), FieldCondition::Ops(ops));
        self
    }

    /// Number of constrained fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if nothing is constrained.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over the constrained fields.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldCondition)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parses a condition from a JSON object.
    ///
    /// A field whose value is a non-empty object made only of operator
    /// names (`eq`, `gt`, `gte`, `lt`, `lte`, `ne`) becomes an operator
    /// set; any other value is a literal.
    ///
    /// ```
    /// use kvquery_core::Condition;
    ///
    /// let condition = Condition::from_json(serde_json::json!({
    ///     "age": {"gte": 25},
    ///     "active": true,
    /// }))
    /// .unwrap();
    /// assert_eq!(condition.len(), 2);
    /// ```
    ///
    /// # Errors
    ///
    /// Fails if `json` is not an object or holds unsupported numbers.
    pub fn from_json(json: Json) -> CodecResult<Self> {
        let Json::Object(object) = json else {
            return Err(CodecError::invalid_structure(
                "a condition must be a JSON object",
            ));
        };

        let mut condition = Self::new();
        for (field, spec) in object {
            let field_condition = match spec {
                Json::Object(ops) if is_operator_object(&ops) => {
                    FieldCondition::Ops(OperatorSet::from_json_object(ops)?)
                }
                literal => FieldCondition::Equals(Value::from_json(literal)?),
            };
            condition.fields.insert(field, field_condition);
        }
        Ok(condition)
    }
}

fn is_operator_object(object: &serde_json::Map<String, Json>) -> bool {
    const OPERATORS: [&str; 6] = ["eq", "gt", "gte", "lt", "lte", "ne"];
    !object.is_empty() && object.keys().all(|k| OPERATORS.contains(&k.as_str()))
}

/// Decides whether `record` satisfies `condition`.
pub fn matches(record: &Record, condition: &Condition) -> bool {
    condition
        .iter()
        .all(|(field, expected)| expected.matches(record.get_or_null(field)))
}

/// Keeps the records that satisfy `condition`, preserving order.
pub fn filter(records: Vec<Record>, condition: &Condition) -> Vec<Record> {
    records
        .into_iter()
        .filter(|record| matches(record, condition))
        .collect()
}
