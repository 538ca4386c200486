//! Expectation suites: ordered rule lists loaded from JSON documents.

use super::rule::{PassMessage, Rule};
use crate::prelude::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Deserialize)]
struct SuiteDocument {
    #[serde(default)]
    expectation_suite_name: Option<String>,
    #[serde(default)]
    expectations: Vec<ExpectationDocument>,
}

#[derive(Debug, Deserialize)]
struct ExpectationDocument {
    expectation_type: String,
    #[serde(default)]
    kwargs: serde_json::Map<String, serde_json::Value>,
}

/// An ordered sequence of rules evaluated against one dataset.
///
/// Suites are read once and never mutated; evaluation stops at the first rule
/// that does not hold.
///
/// # Examples
///
/// ```rust
/// use lakehouse_guard::expectations::{ExpectationSuite, Rule};
///
/// let suite = ExpectationSuite::builder("erp_orders")
///     .rule(Rule::columns_match_ordered(["order_id", "store_id"]))
///     .rule(Rule::not_null("order_id"))
///     .build();
/// assert_eq!(suite.len(), 2);
///
/// let parsed = ExpectationSuite::from_json_str(
///     "crm_leads",
///     r#"{"expectations": [{"expectation_type": "expect_column_values_to_not_be_null",
///                           "kwargs": {"column": "lead_id"}}]}"#,
/// )
/// .unwrap();
/// assert_eq!(parsed.rules()[0].kind(), "not_null");
/// ```
#[derive(Debug, Clone)]
pub struct ExpectationSuite {
    name: String,
    rules: Vec<Rule>,
}

impl ExpectationSuite {
    pub fn builder(name: impl Into<String>) -> ExpectationSuiteBuilder {
        ExpectationSuiteBuilder::new(name)
    }

    /// Reads a suite document from disk.
    ///
    /// The suite is named after `expectation_suite_name` when the document
    /// carries one, otherwise after the file stem.
    #[instrument]
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::invalid_suite(path, format!("Cannot read suite file: {e}"))
        })?;
        let fallback = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("suite")
            .to_string();
        Self::parse(fallback, &content, path)
    }

    /// Parses a suite document held in memory.
    pub fn from_json_str(name: impl Into<String>, json: &str) -> Result<Self> {
        Self::parse(name.into(), json, Path::new(""))
    }

    fn parse(fallback_name: String, json: &str, path: &Path) -> Result<Self> {
        let document: SuiteDocument = serde_json::from_str(json)
            .map_err(|e| PipelineError::invalid_suite(path, e.to_string()))?;

        // Unusable entries stay in place and fail when evaluation reaches them
        let rules = document
            .expectations
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                Rule::from_expectation(&entry.expectation_type, &entry.kwargs).unwrap_or_else(
                    |message| Rule::Malformed {
                        expectation_type: entry.expectation_type.clone(),
                        reason: format!("expectation #{index}: {message}"),
                        suite: PathBuf::from(path),
                    },
                )
            })
            .collect();

        let suite = Self {
            name: document.expectation_suite_name.unwrap_or(fallback_name),
            rules,
        };
        for rule in &suite.rules {
            match rule {
                Rule::Unsupported { .. } => {
                    warn!(suite.name = %suite.name, rule.kind = %rule.kind(), "Suite contains an unsupported expectation");
                }
                Rule::Malformed { reason, .. } => {
                    warn!(suite.name = %suite.name, rule.kind = %rule.kind(), "Suite contains a malformed expectation: {reason}");
                }
                _ => {}
            }
        }
        debug!(suite.name = %suite.name, suite.rules = suite.rules.len(), "Loaded expectation suite");
        Ok(suite)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluates every rule in order against `records`.
    ///
    /// Returns one pass message per rule, or the error of the first rule that
    /// does not hold. Later rules are not evaluated after a failure.
    #[instrument(skip(self, records), fields(
        suite.name = %self.name,
        suite.rules = self.rules.len(),
        dataset = %records.name(),
        rows = records.num_rows()
    ))]
    pub fn validate(&self, records: &RawRecordSet) -> Result<Vec<PassMessage>> {
        let start = Instant::now();
        let mut messages = Vec::with_capacity(self.rules.len());

        for (index, rule) in self.rules.iter().enumerate() {
            match rule.evaluate(records) {
                Ok(message) => {
                    debug!(rule.index = index, rule.kind = %rule.kind(), "{}", message.message);
                    messages.push(message);
                }
                Err(e) => {
                    warn!(
                        rule.index = index,
                        rule.kind = %rule.kind(),
                        error.kind = e.kind(),
                        "Expectation did not hold: {e}"
                    );
                    return Err(e);
                }
            }
        }

        info!(
            passed = messages.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Expectation suite passed"
        );
        Ok(messages)
    }
}

/// Builder for [`ExpectationSuite`].
#[derive(Debug)]
pub struct ExpectationSuiteBuilder {
    name: String,
    rules: Vec<Rule>,
}

impl ExpectationSuiteBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Appends a rule; evaluation follows insertion order.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules<I>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = Rule>,
    {
        self.rules.extend(rules);
        self
    }

    pub fn build(self) -> ExpectationSuite {
        ExpectationSuite {
            name: self.name,
            rules: self.rules,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnDef, ColumnType, Schema, Table};

    fn leads(email: &str) -> RawRecordSet {
        Table::try_new(
            "crm_leads",
            Schema::new(vec![
                ColumnDef::new("lead_id", ColumnType::Integer),
                ColumnDef::new("email", ColumnType::Text),
            ]),
            vec![vec![Value::Int(1), Value::from(email)]],
        )
        .unwrap()
    }

    const SUITE: &str = r#"{
        "expectation_suite_name": "crm_leads_suite",
        "expectations": [
            {"expectation_type": "expect_table_columns_to_match_ordered_list",
             "kwargs": {"column_list": ["lead_id", "email"]}},
            {"expectation_type": "expect_column_values_to_not_be_null",
             "kwargs": {"column": "lead_id"}},
            {"expectation_type": "expect_column_values_to_match_regex",
             "kwargs": {"column": "email", "regex": "^\\S+@\\S+$"}}
        ]
    }"#;

    #[test]
    fn test_parse_keeps_order_and_name() {
        let suite = ExpectationSuite::from_json_str("fallback", SUITE).unwrap();
        assert_eq!(suite.name(), "crm_leads_suite");
        let kinds: Vec<&str> = suite.rules().iter().map(Rule::kind).collect();
        assert_eq!(kinds, vec!["columns_match_ordered", "not_null", "matches_regex"]);
    }

    #[test]
    fn test_validate_returns_one_message_per_rule() {
        let suite = ExpectationSuite::from_json_str("crm", SUITE).unwrap();
        let messages = suite.validate(&leads("a@example.com")).unwrap();
        let texts: Vec<&str> = messages.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Column order validated",
                "Column lead_id not null validated",
                r"Column email regex ^\S+@\S+$ validated",
            ]
        );
    }

    #[test]
    fn test_validate_stops_at_first_failure() {
        let suite = ExpectationSuite::builder("crm")
            .rule(Rule::not_null("lead_id"))
            .rule(Rule::matches_regex("email", r"^\S+@\S+$").unwrap())
            .rule(Rule::unsupported("expect_never_reached"))
            .build();
        let err = suite.validate(&leads("not-an-email")).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ExpectationFailure { ref column, .. } if column.as_deref() == Some("email")
        ));
    }

    #[test]
    fn test_unknown_kind_fails_only_when_reached() {
        let json = r#"{"expectations": [
            {"expectation_type": "expect_column_values_to_not_be_null", "kwargs": {"column": "lead_id"}},
            {"expectation_type": "expect_unknown_thing"}
        ]}"#;
        let suite = ExpectationSuite::from_json_str("crm", json).unwrap();
        assert_eq!(suite.len(), 2);
        let err = suite.validate(&leads("a@example.com")).unwrap_err();
        assert_eq!(err.kind(), "unsupported_rule_kind");
        assert!(err.to_string().contains("expect_unknown_thing"));
    }

    #[test]
    fn test_empty_suite_passes() {
        let suite = ExpectationSuite::from_json_str("empty", "{}").unwrap();
        assert!(suite.is_empty());
        assert!(suite.validate(&leads("x")).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_documents() {
        let err = ExpectationSuite::from_json_str("bad", "[1, 2]").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSuite { .. }));

        let json = r#"{"expectations": [{"expectation_type": "expect_column_values_to_not_be_null", "kwargs": {}}]}"#;
        let suite = ExpectationSuite::from_json_str("bad", json).unwrap();
        let err = suite.validate(&leads("a@example.com")).unwrap_err();
        assert_eq!(err.kind(), "invalid_suite");
        assert!(err.to_string().contains("expectation #0"));
    }

    #[test]
    fn test_earlier_failure_wins_over_later_malformed_rule() {
        let json = r#"{"expectations": [
            {"expectation_type": "expect_column_values_to_not_be_null", "kwargs": {"column": "email"}},
            {"expectation_type": "expect_column_values_to_match_regex", "kwargs": {"column": "email", "regex": "("}}
        ]}"#;
        let suite = ExpectationSuite::from_json_str("crm", json).unwrap();
        assert!(matches!(suite.rules()[1], Rule::Malformed { .. }));

        let records = Table::try_new(
            "crm_leads",
            Schema::new(vec![ColumnDef::new("email", ColumnType::Text)]),
            vec![vec![Value::Null]],
        )
        .unwrap();
        let err = suite.validate(&records).unwrap_err();
        assert_eq!(err.kind(), "expectation_failure");

        // Once the earlier rule holds, the malformed one is reached
        let err = suite.validate(&leads("a@example.com")).unwrap_err();
        assert_eq!(err.kind(), "invalid_suite");
        assert!(err.to_string().contains("expectation #1"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crm_leads.json");
        std::fs::write(&path, r#"{"expectations": []}"#).unwrap();
        let suite = ExpectationSuite::from_file(&path).unwrap();
        assert_eq!(suite.name(), "crm_leads");

        let err = ExpectationSuite::from_file(&dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.kind(), "invalid_suite");
    }
}
