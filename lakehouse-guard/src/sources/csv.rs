//! CSV file source implementation.

use super::{collect_table, extension_filter, path_str, DataSource};
use crate::prelude::*;
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
use async_trait::async_trait;
use datafusion::dataframe::DataFrame;
use datafusion::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Options for configuring CSV file reading.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Whether the CSV file has a header row
    pub has_header: bool,
    /// Field delimiter (default: ',')
    pub delimiter: u8,
    /// Maximum records to read for schema inference
    pub schema_infer_max_records: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            schema_infer_max_records: 1000,
        }
    }
}

/// A delimited text source with a header row.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    options: CsvOptions,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path, CsvOptions::default())
    }

    pub fn with_options(path: impl Into<PathBuf>, options: CsvOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }

    fn read_options<'a>(&self, extension: &'a str) -> CsvReadOptions<'a> {
        CsvReadOptions::new()
            .has_header(self.options.has_header)
            .delimiter(self.options.delimiter)
            .schema_infer_max_records(self.options.schema_infer_max_records)
            .file_extension(extension)
    }

    async fn read(&self, ctx: &SessionContext, options: CsvReadOptions<'_>) -> Result<DataFrame> {
        ctx.read_csv(path_str(&self.path)?, options)
            .await
            .map_err(|e| {
                PipelineError::source_parse_with_source(
                    &self.path,
                    "Failed to open CSV source",
                    Box::new(e),
                )
            })
    }
}

/// Returns the inferred schema with every temporal column read as text, or
/// `None` when nothing was inferred as a date or timestamp.
pub(crate) fn text_preserving_schema(inferred: &ArrowSchema) -> Option<ArrowSchema> {
    if !inferred.fields().iter().any(|f| f.data_type().is_temporal()) {
        return None;
    }
    let fields: Vec<Field> = inferred
        .fields()
        .iter()
        .map(|field| {
            if field.data_type().is_temporal() {
                Field::new(field.name(), DataType::Utf8, true)
            } else {
                field.as_ref().clone()
            }
        })
        .collect();
    Some(ArrowSchema::new(fields))
}

#[async_trait]
impl DataSource for CsvSource {
    #[instrument(skip(self, ctx), fields(path = %self.path.display()))]
    async fn load(&self, ctx: &SessionContext, name: &str) -> Result<RawRecordSet> {
        let extension = extension_filter(&self.path);
        let df = self.read(ctx, self.read_options(&extension)).await?;

        // Date and timestamp text stays as written; staging parses it.
        let inferred = df.schema().inner().clone();
        let df = match text_preserving_schema(&inferred) {
            Some(schema) => {
                debug!("Re-reading temporal columns as text");
                self.read(ctx, self.read_options(&extension).schema(&schema))
                    .await?
            }
            None => df,
        };

        collect_table(df, name, &self.path).await
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn description(&self) -> String {
        format!("CSV file: {}", self.path.display())
    }
}
