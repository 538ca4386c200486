//! Report formatting for pipeline runs and domain validations.
//!
//! # Examples
//!
//! ```rust
//! use lakehouse_guard::formatters::{FormatterConfig, HumanFormatter, ReportFormatter};
//!
//! let formatter = HumanFormatter::with_config(FormatterConfig::default().with_max_rows(5));
//! // let report = pipeline.run("local_output").await?;
//! // println!("{}", formatter.format_run(&report)?);
//! ```

use crate::fact::{FactRow, FACT_COLUMNS};
use crate::pipeline::{DomainValidation, PipelineReport};
use crate::prelude::*;
use serde::Serialize;
use std::fmt::Write;

/// Options shared by all formatters.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Maximum fact rows shown in previews (0 shows none)
    pub max_rows: usize,
    /// Include per-domain validation messages
    pub include_validations: bool,
    /// Include staging table row counts
    pub include_staging: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            max_rows: 20,
            include_validations: true,
            include_staging: true,
        }
    }
}

impl FormatterConfig {
    /// Only the fact preview and artifact location.
    pub fn minimal() -> Self {
        Self {
            max_rows: 10,
            include_validations: false,
            include_staging: false,
        }
    }

    /// Everything, with an unbounded preview.
    pub fn detailed() -> Self {
        Self {
            max_rows: usize::MAX,
            include_validations: true,
            include_staging: true,
        }
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn with_validations(mut self, include: bool) -> Self {
        self.include_validations = include;
        self
    }

    pub fn with_staging(mut self, include: bool) -> Self {
        self.include_staging = include;
        self
    }
}

/// Renders pipeline outcomes as text.
pub trait ReportFormatter {
    /// Formats the report of a full run.
    fn format_run(&self, report: &PipelineReport) -> Result<String>;

    /// Formats the outcome of validating one domain.
    fn format_validation(&self, validation: &DomainValidation) -> Result<String>;
}

fn fmt_error(e: std::fmt::Error) -> PipelineError {
    PipelineError::Internal(format!("Failed to format report: {e}"))
}

fn fact_cells(row: &FactRow) -> [String; 6] {
    [
        row.store_id.clone(),
        row.date.format("%Y-%m-%d").to_string(),
        format!("{:?}", row.revenue),
        row.order_count.to_string(),
        row.converted_leads.to_string(),
        row.sessions.to_string(),
    ]
}

fn validation_line(validation: &DomainValidation) -> String {
    let messages: Vec<&str> = validation
        .messages
        .iter()
        .map(|m| m.message.as_str())
        .collect();
    format!(
        "Validation for {} ({}): {}",
        validation.domain,
        validation.dataset,
        messages.join(", ")
    )
}

/// Plain console output.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn write_run(&self, out: &mut String, report: &PipelineReport) -> std::fmt::Result {
        if self.config.include_validations {
            for validation in &report.validations {
                writeln!(out, "{}", validation_line(validation))?;
            }
        }
        if self.config.include_staging {
            for (table, rows) in &report.staging_rows {
                writeln!(out, "Staged {table}: {rows} rows")?;
            }
        }

        writeln!(out, "Fact table preview:")?;
        let shown: Vec<[String; 6]> = report
            .fact
            .rows()
            .iter()
            .take(self.config.max_rows)
            .map(fact_cells)
            .collect();

        let mut widths = FACT_COLUMNS.map(str::len);
        for cells in &shown {
            for (width, cell) in widths.iter_mut().zip(cells) {
                *width = (*width).max(cell.len());
            }
        }
        let header: Vec<String> = FACT_COLUMNS
            .iter()
            .zip(widths)
            .map(|(name, width)| format!("{name:<width$}"))
            .collect();
        writeln!(out, "{}", header.join("  ").trim_end())?;
        for cells in &shown {
            let line: Vec<String> = cells
                .iter()
                .zip(widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect();
            writeln!(out, "{}", line.join("  ").trim_end())?;
        }
        let hidden = report.fact.len() - shown.len();
        if hidden > 0 {
            writeln!(out, "... {hidden} more rows")?;
        }
        writeln!(out, "[{} rows x {} columns]", report.fact.len(), FACT_COLUMNS.len())?;

        write!(out, "Artifacts written to {}", report.artifact_dir.display())
    }
}

impl ReportFormatter for HumanFormatter {
    fn format_run(&self, report: &PipelineReport) -> Result<String> {
        let mut output = String::new();
        self.write_run(&mut output, report).map_err(fmt_error)?;
        Ok(output)
    }

    fn format_validation(&self, validation: &DomainValidation) -> Result<String> {
        let mut output = validation_line(validation);
        write!(output, " [{} rows]", validation.rows).map_err(fmt_error)?;
        Ok(output)
    }
}

/// Structured JSON output.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            pretty: true,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Sets whether to use pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    fn render(&self, value: &serde_json::Value) -> Result<String> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.map_err(|e| {
            PipelineError::Internal(format!("Failed to serialize report to JSON: {e}"))
        })
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for JsonFormatter {
    fn format_run(&self, report: &PipelineReport) -> Result<String> {
        let mut object = serde_json::Map::new();
        object.insert("status".to_string(), "success".into());
        if self.config.include_validations {
            object.insert("validations".to_string(), to_json(&report.validations)?);
        }
        if self.config.include_staging {
            object.insert("staging_rows".to_string(), to_json(&report.staging_rows)?);
        }
        object.insert("fact_rows".to_string(), to_json(report.fact.rows())?);
        object.insert("artifact_dir".to_string(), to_json(&report.artifact_dir)?);
        object.insert("artifacts".to_string(), to_json(&report.artifacts)?);
        self.render(&serde_json::Value::Object(object))
    }

    fn format_validation(&self, validation: &DomainValidation) -> Result<String> {
        self.render(&to_json(validation)?)
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| PipelineError::Internal(format!("Failed to serialize report to JSON: {e}")))
}

/// Markdown output for run summaries and documentation.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            heading_level: 2,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the base heading level for the output.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 5);
        self
    }

    fn write_run(&self, out: &mut String, report: &PipelineReport) -> std::fmt::Result {
        let h = "#".repeat(self.heading_level as usize);
        writeln!(out, "{h} Lakehouse Pipeline Report")?;

        if self.config.include_validations {
            writeln!(out)?;
            writeln!(out, "{h}# Validations")?;
            writeln!(out)?;
            writeln!(out, "| Domain | Dataset | Rows | Checks passed |")?;
            writeln!(out, "|--------|---------|------|---------------|")?;
            for v in &report.validations {
                writeln!(
                    out,
                    "| {} | {} | {} | {} |",
                    v.domain,
                    v.dataset,
                    v.rows,
                    v.messages.len()
                )?;
            }
        }

        if self.config.include_staging {
            writeln!(out)?;
            writeln!(out, "{h}# Staging tables")?;
            writeln!(out)?;
            writeln!(out, "| Table | Rows |")?;
            writeln!(out, "|-------|------|")?;
            for (table, rows) in &report.staging_rows {
                writeln!(out, "| {table} | {rows} |")?;
            }
        }

        writeln!(out)?;
        writeln!(out, "{h}# Fact table preview")?;
        writeln!(out)?;
        writeln!(out, "| {} |", FACT_COLUMNS.join(" | "))?;
        writeln!(out, "|{}", "---|".repeat(FACT_COLUMNS.len()))?;
        for row in report.fact.rows().iter().take(self.config.max_rows) {
            writeln!(out, "| {} |", fact_cells(row).join(" | "))?;
        }
        let hidden = report.fact.len().saturating_sub(self.config.max_rows);
        if hidden > 0 {
            writeln!(out)?;
            writeln!(out, "> {hidden} more rows not shown.")?;
        }

        writeln!(out)?;
        writeln!(out, "**Artifacts:** `{}`", report.artifact_dir.display())?;
        for path in &report.artifacts {
            writeln!(out, "- `{}`", path.display())?;
        }
        Ok(())
    }
}

impl MarkdownFormatter {
    fn write_validation(&self, out: &mut String, validation: &DomainValidation) -> std::fmt::Result {
        let h = "#".repeat(self.heading_level as usize);
        writeln!(out, "{h} Validation for {} ({})", validation.domain, validation.dataset)?;
        writeln!(out)?;
        writeln!(out, "Rows: {}", validation.rows)?;
        writeln!(out)?;
        for message in &validation.messages {
            writeln!(out, "- ✅ {message}")?;
        }
        Ok(())
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for MarkdownFormatter {
    fn format_run(&self, report: &PipelineReport) -> Result<String> {
        let mut output = String::new();
        self.write_run(&mut output, report).map_err(fmt_error)?;
        Ok(output)
    }

    fn format_validation(&self, validation: &DomainValidation) -> Result<String> {
        let mut output = String::new();
        self.write_validation(&mut output, validation)
            .map_err(fmt_error)?;
        Ok(output)
    }
}
