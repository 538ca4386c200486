//! Pipeline configuration.
//!
//! A [`PipelineConfig`] maps every [`Domain`] to its source file, format and
//! expectation suite. It is built once by the caller, validated, and then only
//! ever passed around by reference.

use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// On-disk format of a domain's source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Delimited text with a header row
    Csv,
    /// One JSON object per line
    NdJson,
}

impl SourceFormat {
    /// Detects the format from a file extension, defaulting to CSV.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") | Some("jsonl") | Some("ndjson") => Self::NdJson,
            _ => Self::Csv,
        }
    }
}

fn default_date_column() -> String {
    "date".to_string()
}

/// Configuration of a single domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Dataset name used in logs and reports (e.g. `erp_orders`)
    pub dataset: String,
    /// Path of the raw source file
    pub source: PathBuf,
    /// Explicit source format; inferred from the extension when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<SourceFormat>,
    /// Path of the expectation suite document
    pub expectations: PathBuf,
    /// Raw column holding the record date; staged as `date`
    #[serde(default = "default_date_column")]
    pub date_column: String,
}

impl DomainConfig {
    pub fn new(
        dataset: impl Into<String>,
        source: impl Into<PathBuf>,
        expectations: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            source: source.into(),
            format: None,
            expectations: expectations.into(),
            date_column: default_date_column(),
        }
    }

    /// Sets an explicit source format.
    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Sets the raw date column name.
    pub fn with_date_column(mut self, column: impl Into<String>) -> Self {
        self.date_column = column.into();
        self
    }

    /// Returns the effective source format.
    pub fn source_format(&self) -> SourceFormat {
        self.format
            .unwrap_or_else(|| SourceFormat::from_path(&self.source))
    }

    fn resolve_against(&mut self, base: &Path) {
        if self.source.is_relative() {
            self.source = base.join(&self.source);
        }
        if self.expectations.is_relative() {
            self.expectations = base.join(&self.expectations);
        }
    }
}

/// Settings for the DataFusion session used to read sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Batch size for reading
    pub batch_size: usize,
    /// Maximum records to read for schema inference
    pub schema_infer_max_records: usize,
    /// Field delimiter for CSV sources
    pub delimiter: char,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 8192,
            schema_infer_max_records: 1000,
            delimiter: ',',
        }
    }
}

/// Configuration for a whole pipeline run.
///
/// # Examples
///
/// ```rust
/// use lakehouse_guard::config::PipelineConfig;
///
/// // Bundled layout: samples/<dataset>.csv|json and expectations/<dataset>.json
/// let config = PipelineConfig::from_base_dir(".").unwrap();
/// assert_eq!(config.domains().count(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    domains: BTreeMap<Domain, DomainConfig>,
    #[serde(default)]
    loader: LoaderConfig,
}

impl PipelineConfig {
    /// Creates a new builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Builds the bundled layout rooted at `base`.
    pub fn from_base_dir(base: impl AsRef<Path>) -> Result<Self> {
        let base = base.as_ref();
        let mut builder = Self::builder();
        for domain in Domain::ALL {
            let dataset = domain.default_dataset();
            let extension = match domain {
                Domain::Web => "json",
                _ => "csv",
            };
            builder = builder.domain(
                domain,
                DomainConfig::new(
                    dataset,
                    base.join("samples").join(format!("{dataset}.{extension}")),
                    base.join("expectations").join(format!("{dataset}.json")),
                ),
            );
        }
        builder.build()
    }

    /// Reads a JSON configuration file.
    ///
    /// Relative paths inside the file resolve against the file's directory.
    #[instrument]
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!(
                "Cannot read config file '{}': {e}",
                path.display()
            ))
        })?;
        let mut config: PipelineConfig = serde_json::from_str(&content).map_err(|e| {
            PipelineError::Configuration(format!(
                "Invalid config file '{}': {e}",
                path.display()
            ))
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for domain_config in config.domains.values_mut() {
            domain_config.resolve_against(base);
        }
        config.validate()?;
        debug!(domains = config.domains.len(), "Loaded pipeline configuration");
        Ok(config)
    }

    /// Checks that every domain is configured and settings are usable.
    pub fn validate(&self) -> Result<()> {
        for domain in Domain::ALL {
            let cfg = self.domain(domain)?;
            if cfg.dataset.trim().is_empty() {
                return Err(PipelineError::Configuration(format!(
                    "Domain '{domain}' has an empty dataset name"
                )));
            }
            if cfg.date_column.trim().is_empty() {
                return Err(PipelineError::Configuration(format!(
                    "Domain '{domain}' has an empty date column"
                )));
            }
        }
        if !self.loader.delimiter.is_ascii() {
            return Err(PipelineError::Configuration(format!(
                "CSV delimiter '{}' must be a single ASCII character",
                self.loader.delimiter
            )));
        }
        if self.loader.batch_size == 0 {
            return Err(PipelineError::Configuration(
                "Batch size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the configuration of one domain.
    pub fn domain(&self, domain: Domain) -> Result<&DomainConfig> {
        self.domains.get(&domain).ok_or_else(|| {
            PipelineError::Configuration(format!("Domain '{domain}' is not configured"))
        })
    }

    /// Iterates over configured domains in processing order.
    pub fn domains(&self) -> impl Iterator<Item = (Domain, &DomainConfig)> {
        self.domains.iter().map(|(domain, cfg)| (*domain, cfg))
    }

    pub fn loader(&self) -> &LoaderConfig {
        &self.loader
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    domains: BTreeMap<Domain, DomainConfig>,
    loader: LoaderConfig,
}

impl PipelineConfigBuilder {
    /// Adds or replaces a domain.
    pub fn domain(mut self, domain: Domain, config: DomainConfig) -> Self {
        self.domains.insert(domain, config);
        self
    }

    pub fn loader(mut self, loader: LoaderConfig) -> Self {
        self.loader = loader;
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> Result<PipelineConfig> {
        let config = PipelineConfig {
            domains: self.domains,
            loader: self.loader,
        };
        config.validate()?;
        Ok(config)
    }
}
