//! Prelude for commonly used types and traits in lakehouse-guard.

pub use crate::config::{DomainConfig, PipelineConfig};
pub use crate::core::{Domain, RawRecordSet, StagingTable, Table, Value};
pub use crate::error::{PipelineError, Result};
pub use crate::formatters::{FormatterConfig, ReportFormatter};
pub use crate::logging::setup::LoggingConfig;
