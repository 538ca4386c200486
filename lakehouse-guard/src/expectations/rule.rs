//! Data-quality rules and their evaluation.

use crate::core::Value;
use crate::logging::{truncate_field, MAX_FIELD_LENGTH};
use crate::prelude::*;
use crate::staging::{parse_date, parse_datetime};
use chrono::NaiveTime;
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

/// Informational message produced by a rule that holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassMessage {
    /// Rule kind that passed
    pub rule: String,
    /// Column the rule targets, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub message: String,
}

impl fmt::Display for PassMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A single expectation of a suite.
///
/// Every supported kind has its own variant. Kinds this engine does not know
/// are kept as [`Rule::Unsupported`] and entries with unusable kwargs as
/// [`Rule::Malformed`]; both fail only when they are reached, so a suite can
/// never silently skip a check.
///
/// # Examples
///
/// ```rust
/// use lakehouse_guard::expectations::Rule;
///
/// let rule = Rule::matches_regex("email", r"^\S+@\S+$").unwrap();
/// assert_eq!(rule.kind(), "matches_regex");
/// assert_eq!(rule.column(), Some("email"));
/// ```
#[derive(Debug, Clone)]
pub enum Rule {
    /// Column names must equal `expected`, in order, with nothing extra.
    ColumnsMatchOrdered { expected: Vec<String> },
    /// No value of `column` may be null.
    NotNull { column: String },
    /// Every non-null value of `column` must be at least `min`, when set.
    ///
    /// Numbers compare with numbers, text with text, dates and timestamps
    /// with each other or with date text.
    MinValue { column: String, min: Option<Value> },
    /// Every value of `column`, rendered as text, must fully match `pattern`.
    MatchesRegex {
        column: String,
        pattern: String,
        regex: Regex,
    },
    /// An `expectation_type` with no implementation.
    Unsupported { kind: String },
    /// A known `expectation_type` whose kwargs cannot be used.
    Malformed {
        expectation_type: String,
        reason: String,
        /// Suite document the entry came from (empty when parsed from memory)
        suite: PathBuf,
    },
}

pub(crate) const COLUMNS_MATCH_ORDERED: &str = "expect_table_columns_to_match_ordered_list";
pub(crate) const NOT_NULL: &str = "expect_column_values_to_not_be_null";
pub(crate) const BETWEEN: &str = "expect_column_values_to_be_between";
pub(crate) const MATCH_REGEX: &str = "expect_column_values_to_match_regex";

impl Rule {
    pub fn columns_match_ordered<I, S>(expected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rule::ColumnsMatchOrdered {
            expected: expected.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_null(column: impl Into<String>) -> Self {
        Rule::NotNull {
            column: column.into(),
        }
    }

    /// Creates a lower-bound rule; a [`Value::Null`] bound leaves it unset.
    pub fn min_value(column: impl Into<String>, min: impl Into<Value>) -> Self {
        let min = match min.into() {
            Value::Null => None,
            bound => Some(bound),
        };
        Rule::MinValue {
            column: column.into(),
            min,
        }
    }

    /// Creates a regex rule; the pattern is anchored at both ends.
    pub fn matches_regex(column: impl Into<String>, pattern: impl Into<String>) -> Result<Self> {
        let column = column.into();
        let pattern = pattern.into();
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            PipelineError::invalid_suite("", format!("Invalid regex for column '{column}': {e}"))
        })?;
        Ok(Rule::MatchesRegex {
            column,
            pattern,
            regex,
        })
    }

    pub fn unsupported(kind: impl Into<String>) -> Self {
        Rule::Unsupported { kind: kind.into() }
    }

    pub fn malformed(expectation_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Rule::Malformed {
            expectation_type: expectation_type.into(),
            reason: reason.into(),
            suite: PathBuf::new(),
        }
    }

    /// Builds a rule from a suite entry.
    ///
    /// Returns an error message when a known kind has malformed kwargs.
    pub(crate) fn from_expectation(
        expectation_type: &str,
        kwargs: &serde_json::Map<String, serde_json::Value>,
    ) -> std::result::Result<Self, String> {
        match expectation_type {
            COLUMNS_MATCH_ORDERED => {
                let list = kwargs
                    .get("column_list")
                    .and_then(|v| v.as_array())
                    .ok_or_else(|| format!("{expectation_type} requires a 'column_list' array"))?;
                let expected = list
                    .iter()
                    .map(|v| {
                        v.as_str().map(str::to_string).ok_or_else(|| {
                            format!("{expectation_type} 'column_list' must contain strings")
                        })
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(Rule::ColumnsMatchOrdered { expected })
            }
            NOT_NULL => Ok(Rule::not_null(required_str(kwargs, "column", expectation_type)?)),
            BETWEEN => {
                let column = required_str(kwargs, "column", expectation_type)?;
                let min = match kwargs.get("min_value") {
                    None => Value::Null,
                    Some(v) => bound_value(v).ok_or_else(|| {
                        format!("{expectation_type} 'min_value' must be a scalar, got {v}")
                    })?,
                };
                Ok(Rule::min_value(column, min))
            }
            MATCH_REGEX => {
                let column = required_str(kwargs, "column", expectation_type)?;
                let pattern = required_str(kwargs, "regex", expectation_type)?;
                Rule::matches_regex(column, pattern).map_err(|e| match e {
                    PipelineError::InvalidSuite { message, .. } => message,
                    other => other.to_string(),
                })
            }
            other => Ok(Rule::unsupported(other)),
        }
    }

    /// Short name of the rule kind; the raw type for unsupported rules.
    pub fn kind(&self) -> &str {
        match self {
            Rule::ColumnsMatchOrdered { .. } => "columns_match_ordered",
            Rule::NotNull { .. } => "not_null",
            Rule::MinValue { .. } => "min_value",
            Rule::MatchesRegex { .. } => "matches_regex",
            Rule::Unsupported { kind } => kind,
            Rule::Malformed {
                expectation_type, ..
            } => expectation_type,
        }
    }

    /// The suite document's `expectation_type` for this rule.
    pub fn expectation_type(&self) -> &str {
        match self {
            Rule::ColumnsMatchOrdered { .. } => COLUMNS_MATCH_ORDERED,
            Rule::NotNull { .. } => NOT_NULL,
            Rule::MinValue { .. } => BETWEEN,
            Rule::MatchesRegex { .. } => MATCH_REGEX,
            Rule::Unsupported { kind } => kind,
            Rule::Malformed {
                expectation_type, ..
            } => expectation_type,
        }
    }

    /// Column the rule targets, if it targets one.
    pub fn column(&self) -> Option<&str> {
        match self {
            Rule::NotNull { column }
            | Rule::MinValue { column, .. }
            | Rule::MatchesRegex { column, .. } => Some(column),
            Rule::ColumnsMatchOrdered { .. }
            | Rule::Unsupported { .. }
            | Rule::Malformed { .. } => None,
        }
    }

    /// Evaluates the rule, returning its pass message or the violation.
    pub fn evaluate(&self, records: &RawRecordSet) -> Result<PassMessage> {
        let message = match self {
            Rule::ColumnsMatchOrdered { expected } => {
                let actual = records.column_names();
                if actual != *expected {
                    return Err(self.failure(format!(
                        "Column order mismatch. Expected {expected:?}, got {actual:?}"
                    )));
                }
                "Column order validated".to_string()
            }
            Rule::NotNull { column } => {
                let values = self.values(records, column)?;
                let nulls = values.filter(|v| v.is_null()).count();
                if nulls > 0 {
                    return Err(self.failure(format!(
                        "Null values found in {column} ({nulls} of {} rows)",
                        records.num_rows()
                    )));
                }
                format!("Column {column} not null validated")
            }
            Rule::MinValue { column, min: None } => {
                format!("Column {column} has no minimum, skipped")
            }
            Rule::MinValue {
                column,
                min: Some(min),
            } => {
                let mut below = 0usize;
                let mut first_below: Option<&Value> = None;
                for value in self.values(records, column)?.filter(|v| !is_missing(v)) {
                    let ordering = compare(value, min).ok_or_else(|| {
                        self.failure(format!(
                            "{} value '{}' in {column} cannot be compared to {min}",
                            value.column_type(),
                            truncate_field(&value.to_text(), MAX_FIELD_LENGTH)
                        ))
                    })?;
                    if ordering == Ordering::Less {
                        below += 1;
                        first_below.get_or_insert(value);
                    }
                }
                if let Some(first) = first_below {
                    return Err(self.failure(format!(
                        "Values in {column} below {min} ({below} rows, first: {first})"
                    )));
                }
                format!("Column {column} minimum {min} validated")
            }
            Rule::MatchesRegex {
                column,
                pattern,
                regex,
            } => {
                let mut mismatches = self
                    .values(records, column)?
                    .map(Value::to_text)
                    .filter(|text| !regex.is_match(text));
                if let Some(first) = mismatches.next() {
                    let count = 1 + mismatches.count();
                    return Err(self.failure(format!(
                        "Regex validation failed for {column}: {count} values do not match {pattern}, first: '{}'",
                        truncate_field(&first, MAX_FIELD_LENGTH)
                    )));
                }
                format!("Column {column} regex {pattern} validated")
            }
            Rule::Unsupported { kind } => {
                return Err(PipelineError::UnsupportedRuleKind { kind: kind.clone() });
            }
            Rule::Malformed { reason, suite, .. } => {
                return Err(PipelineError::invalid_suite(suite, reason.clone()));
            }
        };

        Ok(PassMessage {
            rule: self.kind().to_string(),
            column: self.column().map(str::to_string),
            message,
        })
    }

    fn values<'a>(
        &self,
        records: &'a RawRecordSet,
        column: &str,
    ) -> Result<impl Iterator<Item = &'a Value>> {
        records.column_values(column).map_err(|_| {
            self.failure(format!(
                "Column '{column}' not found in dataset {}",
                records.name()
            ))
        })
    }

    fn failure(&self, detail: String) -> PipelineError {
        PipelineError::expectation_failure(self.kind(), self.column(), detail)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::ColumnsMatchOrdered { expected } => {
                write!(f, "columns_match_ordered({})", expected.join(", "))
            }
            Rule::NotNull { column } => write!(f, "not_null({column})"),
            Rule::MinValue { column, min: None } => write!(f, "min_value({column})"),
            Rule::MinValue {
                column,
                min: Some(min),
            } => write!(f, "min_value({column}, {min})"),
            Rule::MatchesRegex {
                column, pattern, ..
            } => write!(f, "matches_regex({column}, {pattern})"),
            Rule::Unsupported { kind } => write!(f, "unsupported({kind})"),
            Rule::Malformed {
                expectation_type, ..
            } => write!(f, "malformed({expectation_type})"),
        }
    }
}

/// Nulls and NaN floats are skipped by comparisons.
fn is_missing(value: &Value) -> bool {
    matches!(value, Value::Null) || matches!(value, Value::Float(f) if f.is_nan())
}

/// Orders a column value against a bound, or `None` when they are not comparable.
fn compare(value: &Value, bound: &Value) -> Option<Ordering> {
    match (value, bound) {
        (Value::Text(a), Value::Text(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Text(b)) => parse_date(b).map(|b| a.cmp(&b)),
        (Value::Date(a), Value::Timestamp(b)) => Some(a.and_time(NaiveTime::MIN).cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Date(b)) => Some(a.cmp(&b.and_time(NaiveTime::MIN))),
        (Value::Timestamp(a), Value::Text(b)) => parse_datetime(b)
            .or_else(|| parse_date(b).map(|d| d.and_time(NaiveTime::MIN)))
            .map(|b| a.cmp(&b)),
        _ => {
            let (a, b) = value.as_f64().zip(bound.as_f64())?;
            a.partial_cmp(&b)
        }
    }
}

/// Converts a scalar kwarg into a bound; `None` for arrays and objects.
fn bound_value(json: &serde_json::Value) -> Option<Value> {
    match json {
        serde_json::Value::Null => Some(Value::Null),
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float)),
        serde_json::Value::String(s) => Some(Value::Text(s.clone())),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
    }
}

fn required_str(
    kwargs: &serde_json::Map<String, serde_json::Value>,
    key: &str,
    expectation_type: &str,
) -> std::result::Result<String, String> {
    kwargs
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| format!("{expectation_type} requires a string '{key}'"))
}
