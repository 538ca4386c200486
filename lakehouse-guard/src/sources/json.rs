//! Newline-delimited JSON source implementation.

use super::{collect_table, extension_filter, path_str, DataSource};
use crate::prelude::*;
use async_trait::async_trait;
use datafusion::prelude::*;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Options for configuring NDJSON file reading.
#[derive(Debug, Clone)]
pub struct JsonOptions {
    /// Maximum records to read for schema inference
    pub schema_infer_max_records: usize,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            schema_infer_max_records: 1000,
        }
    }
}

/// A file holding one JSON object per line.
///
/// Columns appear in the order keys are first seen. Nested objects and arrays
/// are kept as JSON values.
#[derive(Debug, Clone)]
pub struct JsonSource {
    path: PathBuf,
    options: JsonOptions,
}

impl JsonSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path, JsonOptions::default())
    }

    pub fn with_options(path: impl Into<PathBuf>, options: JsonOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }
}

#[async_trait]
impl DataSource for JsonSource {
    #[instrument(skip(self, ctx), fields(path = %self.path.display()))]
    async fn load(&self, ctx: &SessionContext, name: &str) -> Result<RawRecordSet> {
        let extension = extension_filter(&self.path);
        let mut options = NdJsonReadOptions::default();
        options.schema_infer_max_records = self.options.schema_infer_max_records;
        options.file_extension = &extension;

        let df = ctx
            .read_json(path_str(&self.path)?, options)
            .await
            .map_err(|e| {
                PipelineError::source_parse_with_source(
                    &self.path,
                    "Failed to open NDJSON source",
                    Box::new(e),
                )
            })?;

        collect_table(df, name, &self.path).await
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn description(&self) -> String {
        format!("NDJSON file: {}", self.path.display())
    }
}
