//! Dataset loading for domain source files.
//!
//! Sources are read through a DataFusion [`SessionContext`] with schema
//! inference, then materialised as a [`RawRecordSet`] whose columns keep the
//! order the file declares. Numbers and booleans follow schema inference; date
//! and timestamp text is kept exactly as written. Type casts belong to staging.

use crate::config::{DomainConfig, LoaderConfig, SourceFormat};
use crate::prelude::*;
use async_trait::async_trait;
use datafusion::dataframe::DataFrame;
use datafusion::execution::context::{SessionConfig, SessionContext};
use std::fmt::Debug;
use std::path::Path;
use tracing::{debug, info, instrument};

mod convert;
mod csv;
mod json;

pub use csv::{CsvOptions, CsvSource};
pub use json::{JsonOptions, JsonSource};

/// A file that can be read into a [`RawRecordSet`].
///
/// # Examples
///
/// ```rust,no_run
/// use lakehouse_guard::sources::{CsvSource, DataSource};
/// use datafusion::prelude::SessionContext;
///
/// # async fn example() -> lakehouse_guard::error::Result<()> {
/// let source = CsvSource::new("samples/erp_orders.csv");
/// let ctx = SessionContext::new();
/// let records = source.load(&ctx, "erp_orders").await?;
/// println!("{} rows", records.num_rows());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait DataSource: Debug + Send + Sync {
    /// Reads the whole file into a record set named `name`.
    async fn load(&self, ctx: &SessionContext, name: &str) -> Result<RawRecordSet>;

    /// Returns the path this source reads from.
    fn path(&self) -> &Path;

    /// Returns a human-readable description of this data source.
    fn description(&self) -> String;
}

/// Loads each domain's configured source file.
///
/// A single-partition session is used so that rows come back in file order.
#[derive(Clone)]
pub struct DatasetLoader {
    ctx: SessionContext,
    config: LoaderConfig,
}

impl Debug for DatasetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetLoader")
            .field("config", &self.config)
            .finish()
    }
}

impl DatasetLoader {
    pub fn new(config: &LoaderConfig) -> Self {
        let session_config = SessionConfig::new()
            .with_batch_size(config.batch_size)
            .with_target_partitions(1);
        Self {
            ctx: SessionContext::new_with_config(session_config),
            config: config.clone(),
        }
    }

    /// Builds the source for a domain's configuration.
    pub fn source_for(&self, domain_config: &DomainConfig) -> Box<dyn DataSource> {
        let path = domain_config.source.clone();
        match domain_config.source_format() {
            SourceFormat::Csv => Box::new(CsvSource::with_options(
                path,
                CsvOptions {
                    delimiter: self.config.delimiter as u8,
                    schema_infer_max_records: self.config.schema_infer_max_records,
                    ..Default::default()
                },
            )),
            SourceFormat::NdJson => Box::new(JsonSource::with_options(
                path,
                JsonOptions {
                    schema_infer_max_records: self.config.schema_infer_max_records,
                },
            )),
        }
    }

    /// Reads a domain's raw records.
    ///
    /// Fails with `SourceNotFound` when the file is absent and `SourceParse`
    /// when it cannot be decoded into a table.
    #[instrument(skip(self, domain_config), fields(domain = %domain, dataset = %domain_config.dataset))]
    pub async fn load(&self, domain: Domain, domain_config: &DomainConfig) -> Result<RawRecordSet> {
        if !domain_config.source.is_file() {
            return Err(PipelineError::SourceNotFound {
                domain: domain.to_string(),
                path: domain_config.source.clone(),
            });
        }

        let source = self.source_for(domain_config);
        debug!(source = %source.description(), "Reading domain source");
        let records = source.load(&self.ctx, &domain_config.dataset).await?;

        info!(
            rows = records.num_rows(),
            columns = records.num_columns(),
            "Loaded raw records"
        );
        Ok(records)
    }
}

/// Returns the extension filter DataFusion needs to accept `path`.
pub(crate) fn extension_filter(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

pub(crate) fn path_str(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| {
        PipelineError::Configuration(format!(
            "Source path '{}' contains invalid UTF-8",
            path.display()
        ))
    })
}

/// Collects a DataFrame into a record set.
pub(crate) async fn collect_table(df: DataFrame, name: &str, path: &Path) -> Result<RawRecordSet> {
    let arrow_schema = df.schema().inner().clone();
    if arrow_schema.fields().is_empty() {
        return Err(PipelineError::source_parse(path, "No columns could be inferred"));
    }

    let batches = df.collect().await.map_err(|e| {
        PipelineError::source_parse_with_source(path, "Failed to read records", Box::new(e))
    })?;

    convert::record_batches_to_table(name, path, &arrow_schema, &batches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_filter() {
        assert_eq!(extension_filter(Path::new("a/erp_orders.csv")), ".csv");
        assert_eq!(extension_filter(Path::new("events.jsonl")), ".jsonl");
        assert_eq!(extension_filter(Path::new("orders")), "");
    }

    #[test]
    fn test_source_selection_follows_format() {
        let loader = DatasetLoader::new(&LoaderConfig::default());
        let csv = loader.source_for(&DomainConfig::new("erp_orders", "erp.csv", "erp.json"));
        assert!(csv.description().starts_with("CSV"));

        let json = loader.source_for(&DomainConfig::new("web_events", "web.json", "web.json"));
        assert!(json.description().starts_with("NDJSON"));
    }

    #[tokio::test]
    async fn test_missing_source_is_reported() {
        let loader = DatasetLoader::new(&LoaderConfig::default());
        let config = DomainConfig::new("erp_orders", "/definitely/not/here.csv", "erp.json");
        let err = loader.load(Domain::Erp, &config).await.unwrap_err();
        assert!(matches!(err, PipelineError::SourceNotFound { .. }));
        assert_eq!(err.kind(), "source_not_found");
    }
}
