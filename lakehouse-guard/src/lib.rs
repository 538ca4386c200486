//! # Lakehouse Guard - quality-gated lakehouse pipeline
//!
//! Lakehouse Guard loads raw business datasets (ERP orders, CRM leads, web
//! events and the product catalog), gates each one behind an expectation
//! suite, normalizes it into a staging table and aggregates the staging tables
//! into a daily per-store fact table, `fct_daily_store_metrics`. Sources are
//! read through DataFusion and written back out as CSV artifacts.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lakehouse_guard::prelude::*;
//! use lakehouse_guard::formatters::HumanFormatter;
//! use lakehouse_guard::pipeline::Pipeline;
//!
//! # async fn example() -> Result<()> {
//! // samples/<dataset>.csv|json and expectations/<dataset>.json under "."
//! let config = PipelineConfig::from_base_dir(".")?;
//! let pipeline = Pipeline::new(config);
//!
//! // Validate a single domain, as an orchestrator task would
//! let validation = pipeline.validate_domain(Domain::Crm).await?;
//! println!("{} rules passed", validation.messages.len());
//!
//! // Or run everything and write artifacts to local_output/curated
//! let report = pipeline.run("local_output").await?;
//! println!("{}", HumanFormatter::new().format_run(&report)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Flow
//!
//! For each domain, in order `erp`, `crm`, `web`, `product`:
//!
//! 1. **Load** the configured source file ([`sources`])
//! 2. **Validate** it against its suite ([`expectations`]); the first failing
//!    rule aborts the run
//! 3. **Stage** it into its fixed staging schema ([`staging`])
//!
//! Then **aggregate** every staging table into the fact table ([`fact`]) and
//! **write** all tables as CSV ([`writer`]).
//!
//! ## Architecture
//!
//! - **`core`**: `Domain`, `Value`, `Schema` and `Table`
//! - **`config`**: per-domain sources, suites and loader settings
//! - **`sources`**: CSV and NDJSON loading through DataFusion
//! - **`expectations`**: rules, suites and the validation engine
//! - **`staging`**: projection and type coercion per domain
//! - **`fact`**: outer-join aggregation into daily store metrics
//! - **`writer`**: CSV artifacts via the Arrow CSV writer
//! - **`pipeline`**: per-domain validation and full runs
//! - **`formatters`**: human, JSON and Markdown reports
//! - **`logging`**: `tracing` subscriber setup

pub mod config;
pub mod core;
pub mod error;
pub mod expectations;
pub mod fact;
pub mod formatters;
pub mod logging;
pub mod pipeline;
pub mod prelude;
pub mod sources;
pub mod staging;
pub mod writer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;
