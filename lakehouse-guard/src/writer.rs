//! Artifact writer: one CSV file per table.

use crate::core::{ColumnType, Table};
use crate::fact::FactTable;
use crate::prelude::*;
use arrow::array::{ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Writes tables as `<dest>/<table name>.csv`, replacing existing files.
///
/// # Examples
///
/// ```rust,no_run
/// use lakehouse_guard::fact::FactTable;
/// use lakehouse_guard::writer::ArtifactWriter;
/// use std::collections::BTreeMap;
///
/// let writer = ArtifactWriter::new("local_output/curated");
/// let paths = writer.write_all(&BTreeMap::new(), &FactTable::default()).unwrap();
/// assert_eq!(paths.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dest: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self { dest: dest.into() }
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Path a table is written to.
    pub fn path_for(&self, table_name: &str) -> PathBuf {
        self.dest.join(format!("{table_name}.csv"))
    }

    /// Creates the destination directory if it does not exist.
    pub fn ensure_dest(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dest).map_err(|e| {
            PipelineError::write(&self.dest, "Cannot create artifact directory", Box::new(e))
        })
    }

    /// Writes one table and returns the file path.
    #[instrument(skip(self, table), fields(table = %table.name(), rows = table.num_rows()))]
    pub fn write_table(&self, table: &Table) -> Result<PathBuf> {
        self.ensure_dest()?;
        let path = self.path_for(table.name());

        let batch = table_to_batch(table)
            .map_err(|e| PipelineError::write(&path, "Cannot encode table", Box::new(e)))?;
        let file = File::create(&path)
            .map_err(|e| PipelineError::write(&path, "Cannot create file", Box::new(e)))?;
        let mut writer = WriterBuilder::new().with_header(true).build(file);
        writer
            .write(&batch)
            .map_err(|e| PipelineError::write(&path, "Cannot write CSV", Box::new(e)))?;

        debug!(path = %path.display(), "Wrote artifact");
        Ok(path)
    }

    /// Writes every staging table followed by the fact table.
    pub fn write_all(
        &self,
        staging: &BTreeMap<String, StagingTable>,
        fact: &FactTable,
    ) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(staging.len() + 1);
        for table in staging.values() {
            paths.push(self.write_table(table)?);
        }
        paths.push(self.write_table(&fact.to_table()?)?);
        info!(dest = %self.dest.display(), artifacts = paths.len(), "Artifacts written");
        Ok(paths)
    }
}

fn table_to_batch(table: &Table) -> std::result::Result<RecordBatch, arrow::error::ArrowError> {
    let mut fields = Vec::with_capacity(table.num_columns());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.num_columns());

    for (index, column) in table.schema().columns().iter().enumerate() {
        let values = table.rows().iter().map(|row| &row[index]);
        let (data_type, array): (DataType, ArrayRef) = match column.column_type {
            ColumnType::Integer => (
                DataType::Int64,
                Arc::new(Int64Array::from_iter(values.map(|v| match v {
                    Value::Int(i) => Some(*i),
                    _ => None,
                }))),
            ),
            ColumnType::Float => (
                DataType::Float64,
                Arc::new(Float64Array::from_iter(values.map(Value::as_f64))),
            ),
            ColumnType::Boolean => (
                DataType::Boolean,
                Arc::new(BooleanArray::from_iter(values.map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                }))),
            ),
            ColumnType::Date => (
                DataType::Date32,
                Arc::new(Date32Array::from_iter(values.map(|v| match v {
                    Value::Date(d) => Some(days_since_epoch(*d)),
                    _ => None,
                }))),
            ),
            ColumnType::Text | ColumnType::Timestamp | ColumnType::Nested | ColumnType::Null => (
                DataType::Utf8,
                Arc::new(StringArray::from_iter(values.map(|v| {
                    if v.is_null() {
                        None
                    } else {
                        Some(v.to_text())
                    }
                }))),
            ),
        };
        fields.push(Field::new(&column.name, data_type, true));
        arrays.push(array);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(table.num_rows()));
    RecordBatch::try_new_with_options(Arc::new(ArrowSchema::new(fields)), arrays, &options)
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}
