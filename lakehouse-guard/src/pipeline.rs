//! Pipeline entry points.
//!
//! A run processes domains strictly one after another (load, validate,
//! stage), aggregates once every domain is staged and finally writes the
//! artifacts. The first error aborts the run and is returned unchanged.

use crate::expectations::{ExpectationSuite, PassMessage};
use crate::fact::{aggregate, FactTable};
use crate::prelude::*;
use crate::sources::DatasetLoader;
use crate::staging::stage_domain;
use crate::writer::ArtifactWriter;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, instrument};

/// Sub-directory of the output directory receiving the artifacts.
pub const CURATED_DIR: &str = "curated";

/// Outcome of validating one domain.
#[derive(Debug, Clone, Serialize)]
pub struct DomainValidation {
    pub domain: Domain,
    pub dataset: String,
    /// Rows in the raw dataset
    pub rows: usize,
    /// One message per rule, in suite order
    pub messages: Vec<PassMessage>,
}

/// Outcome of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub validations: Vec<DomainValidation>,
    /// Row count per staging table
    pub staging_rows: BTreeMap<String, usize>,
    pub fact: FactTable,
    pub artifact_dir: PathBuf,
    pub artifacts: Vec<PathBuf>,
}

/// Runs domains through validation, staging, aggregation and writing.
///
/// # Examples
///
/// ```rust,no_run
/// use lakehouse_guard::prelude::*;
/// use lakehouse_guard::pipeline::Pipeline;
///
/// # async fn example() -> Result<()> {
/// let pipeline = Pipeline::new(PipelineConfig::from_base_dir(".")?);
/// let report = pipeline.run("local_output").await?;
/// println!("{} fact rows written to {}", report.fact.len(), report.artifact_dir.display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    loader: DatasetLoader,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let loader = DatasetLoader::new(config.loader());
        Self { config, loader }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Loads one domain and validates it against its suite.
    ///
    /// This is the per-domain entry point used by orchestrators.
    pub async fn validate_domain(&self, domain: Domain) -> Result<DomainValidation> {
        self.load_and_validate(domain)
            .await
            .map(|(_, validation)| validation)
    }

    #[instrument(skip(self), fields(domain = %domain))]
    async fn load_and_validate(&self, domain: Domain) -> Result<(RawRecordSet, DomainValidation)> {
        let domain_config = self.config.domain(domain)?;
        let records = self.loader.load(domain, domain_config).await?;
        let suite = ExpectationSuite::from_file(&domain_config.expectations)?;
        let messages = suite.validate(&records).inspect_err(|e| {
            error!(error.kind = e.kind(), dataset = %domain_config.dataset, "Validation failed: {e}");
        })?;

        let validation = DomainValidation {
            domain,
            dataset: domain_config.dataset.clone(),
            rows: records.num_rows(),
            messages,
        };
        Ok((records, validation))
    }

    /// Runs every domain and writes artifacts to `<output_dir>/curated`.
    #[instrument(skip(self, output_dir), fields(output_dir = %output_dir.as_ref().display()))]
    pub async fn run(&self, output_dir: impl AsRef<Path>) -> Result<PipelineReport> {
        let start = Instant::now();
        let mut validations = Vec::new();
        let mut staging = BTreeMap::new();

        for (domain, domain_config) in self.config.domains() {
            let (records, validation) = self.load_and_validate(domain).await?;
            info!(
                domain = %domain,
                dataset = %validation.dataset,
                passed = validation.messages.len(),
                "Domain validated"
            );
            let table = stage_domain(domain, &records, &domain_config.date_column)?;
            staging.insert(domain.staging_table().to_string(), table);
            validations.push(validation);
        }

        let fact = aggregate(&staging)?;
        let writer = ArtifactWriter::new(output_dir.as_ref().join(CURATED_DIR));
        let artifacts = writer.write_all(&staging, &fact)?;

        info!(
            domains = validations.len(),
            fact.rows = fact.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Pipeline run completed"
        );

        Ok(PipelineReport {
            validations,
            staging_rows: staging
                .iter()
                .map(|(name, table)| (name.clone(), table.num_rows()))
                .collect(),
            fact,
            artifact_dir: writer.dest().to_path_buf(),
            artifacts,
        })
    }
}
