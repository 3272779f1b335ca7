//! Declarative filters and their compiled predicates.

use evedex_model::{FieldValue, IndexKey, Record, fold_case};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::{QueryError, QueryResult};

/// A filter operator.
///
/// Names follow the wire form used by the browser client (`startsWith`,
/// `greaterThan`, ...). Unknown names are rejected rather than ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "String")]
pub enum Operator {
    Equals,
    StartsWith,
    Contains,
    GreaterThan,
    LessThan,
    Between,
}

impl Operator {
    pub const ALL: [Operator; 6] = [
        Operator::Equals,
        Operator::StartsWith,
        Operator::Contains,
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::Between,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::StartsWith => "startsWith",
            Operator::Contains => "contains",
            Operator::GreaterThan => "greaterThan",
            Operator::LessThan => "lessThan",
            Operator::Between => "between",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| QueryError::UnsupportedOperator(s.to_string()))
    }
}

impl TryFrom<String> for Operator {
    type Error = QueryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

fn default_ignore_case() -> bool {
    true
}

/// One predicate clause of a query. A list of filters is AND-combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
    /// Applies to `equals`, `startsWith` and `contains` on text.
    #[serde(default = "default_ignore_case")]
    pub ignore_case: bool,
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            ignore_case: true,
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Equals, value)
    }

    pub fn starts_with(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::StartsWith, value)
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Contains, value)
    }

    pub fn greater_than(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::GreaterThan, value)
    }

    pub fn less_than(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::LessThan, value)
    }

    pub fn between(
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Self::new(field, Operator::Between, Value::Array(vec![low.into(), high.into()]))
    }

    /// Turns case-insensitive matching on or off.
    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn case_sensitive(self) -> Self {
        self.with_ignore_case(false)
    }

    /// Tests a single record against this filter.
    pub fn matches(&self, record: &Record) -> QueryResult<bool> {
        Ok(self.compile()?.matches(record))
    }

    pub(crate) fn compile(&self) -> QueryResult<CompiledFilter<'_>> {
        let predicate = match self.operator {
            Operator::Equals => Predicate::Equals {
                operand: self.operand()?,
                ignore_case: self.ignore_case,
            },
            Operator::StartsWith => Predicate::StartsWith {
                needle: self.needle()?,
                ignore_case: self.ignore_case,
            },
            Operator::Contains => Predicate::Contains {
                needle: self.needle()?,
                ignore_case: self.ignore_case,
            },
            Operator::GreaterThan => Predicate::GreaterThan(self.key(&self.value)?),
            Operator::LessThan => Predicate::LessThan(self.key(&self.value)?),
            Operator::Between => match &self.value {
                Value::Array(bounds) if bounds.len() == 2 => {
                    Predicate::Between(self.key(&bounds[0])?, self.key(&bounds[1])?)
                }
                _ => return Err(self.invalid("expected a [low, high] array")),
            },
        };
        Ok(CompiledFilter {
            field: &self.field,
            predicate,
        })
    }

    fn operand(&self) -> QueryResult<Operand> {
        match FieldValue::from_json(&self.value) {
            Some(FieldValue::Number(n)) => Ok(Operand::Number(n)),
            Some(FieldValue::Text(s)) if self.ignore_case => Ok(Operand::Text(fold_case(s))),
            Some(FieldValue::Text(s)) => Ok(Operand::Text(s.to_string())),
            Some(FieldValue::Bool(b)) => Ok(Operand::Bool(b)),
            None => Err(self.invalid("expected a number, string or boolean")),
        }
    }

    fn needle(&self) -> QueryResult<String> {
        let value = FieldValue::from_json(&self.value)
            .ok_or_else(|| self.invalid("expected a number, string or boolean"))?;
        let needle = value.stringify();
        Ok(if self.ignore_case {
            fold_case(&needle)
        } else {
            needle.into_owned()
        })
    }

    fn key(&self, value: &Value) -> QueryResult<IndexKey> {
        IndexKey::from_json(value).ok_or_else(|| self.invalid("expected a number or string"))
    }

    fn invalid(&self, reason: &str) -> QueryError {
        QueryError::InvalidFilterValue {
            field: self.field.clone(),
            operator: self.operator.as_str(),
            reason: reason.to_string(),
        }
    }
}

/// Equality operand; text is pre-folded when matching ignores case.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    Number(f64),
    Text(String),
    Bool(bool),
}

/// A validated filter, ready to test records.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Predicate {
    Equals { operand: Operand, ignore_case: bool },
    StartsWith { needle: String, ignore_case: bool },
    Contains { needle: String, ignore_case: bool },
    GreaterThan(IndexKey),
    LessThan(IndexKey),
    Between(IndexKey, IndexKey),
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledFilter<'a> {
    pub field: &'a str,
    pub predicate: Predicate,
}

impl CompiledFilter<'_> {
    /// Absent fields (missing, null, arrays, objects) never match.
    pub fn matches(&self, record: &Record) -> bool {
        let Some(value) = record.field(self.field) else {
            return false;
        };

        match &self.predicate {
            Predicate::Equals { operand, ignore_case } => match (operand, value) {
                (Operand::Number(n), FieldValue::Number(v)) => *n == v,
                (Operand::Bool(b), FieldValue::Bool(v)) => *b == v,
                (Operand::Text(t), FieldValue::Text(v)) if *ignore_case => fold_case(v) == *t,
                (Operand::Text(t), FieldValue::Text(v)) => t == v,
                _ => false,
            },
            Predicate::StartsWith { needle, ignore_case } => {
                haystack(value, *ignore_case).starts_with(needle.as_str())
            }
            Predicate::Contains { needle, ignore_case } => {
                haystack(value, *ignore_case).contains(needle.as_str())
            }
            Predicate::GreaterThan(bound) => {
                comparable(value, bound).is_some_and(|key| key > *bound)
            }
            Predicate::LessThan(bound) => comparable(value, bound).is_some_and(|key| key < *bound),
            Predicate::Between(low, high) => {
                low.same_kind(high)
                    && comparable(value, low).is_some_and(|key| *low <= key && key <= *high)
            }
        }
    }
}

fn haystack(value: FieldValue<'_>, ignore_case: bool) -> String {
    let text = value.stringify();
    if ignore_case {
        fold_case(&text)
    } else {
        text.into_owned()
    }
}

/// Index key of the field value when it is of the same kind as `bound`.
fn comparable(value: FieldValue<'_>, bound: &IndexKey) -> Option<IndexKey> {
    IndexKey::from_field(value).filter(|key| key.same_kind(bound))
}
