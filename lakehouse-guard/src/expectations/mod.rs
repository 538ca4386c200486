//! Expectation engine.
//!
//! Suites are written in the Great Expectations document shape:
//!
//! ```json
//! { "expectations": [ { "expectation_type": "...", "kwargs": { ... } } ] }
//! ```
//!
//! | `expectation_type` | Rule | kwargs |
//! |---|---|---|
//! | `expect_table_columns_to_match_ordered_list` | [`Rule::ColumnsMatchOrdered`] | `column_list` |
//! | `expect_column_values_to_not_be_null` | [`Rule::NotNull`] | `column` |
//! | `expect_column_values_to_be_between` | [`Rule::MinValue`] | `column`, `min_value` |
//! | `expect_column_values_to_match_regex` | [`Rule::MatchesRegex`] | `column`, `regex` |
//!
//! Any other type becomes [`Rule::Unsupported`] and fails validation when it
//! is reached. A known type whose kwargs cannot be used becomes
//! [`Rule::Malformed`] and fails with `invalid_suite` at the same point.

mod rule;
mod suite;

pub use rule::{PassMessage, Rule};
pub use suite::{ExpectationSuite, ExpectationSuiteBuilder};

use crate::prelude::*;

/// Validates `records` against `suite`, short-circuiting on the first failure.
pub fn validate(records: &RawRecordSet, suite: &ExpectationSuite) -> Result<Vec<PassMessage>> {
    suite.validate(records)
}
