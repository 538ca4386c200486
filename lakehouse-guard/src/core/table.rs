//! Ordered schemas and fixed-arity row tables.

use super::value::{ColumnType, Value};
use crate::prelude::*;
use serde::{Deserialize, Serialize};

/// A named, typed column descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// An ordered list of column descriptors.
///
/// Column order is significant: it is the order the source declared and the
/// order artifacts are written in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<ColumnDef>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the column names in declared order.
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns the position of a column by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// One row of a [`Table`]; its length always equals the schema length.
pub type Row = Vec<Value>;

/// An immutable, named table of rows sharing one schema.
///
/// Every non-null value in a column has that column's type.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    schema: Schema,
    rows: Vec<Row>,
}

/// A domain's dataset as loaded from its source file.
pub type RawRecordSet = Table;

/// A domain's dataset after projection and coercion into its staging schema.
pub type StagingTable = Table;

impl Table {
    /// Creates a table, checking row arity and value types against the schema.
    pub fn try_new(name: impl Into<String>, schema: Schema, rows: Vec<Row>) -> Result<Self> {
        let name = name.into();
        for (index, row) in rows.iter().enumerate() {
            if row.len() != schema.len() {
                return Err(PipelineError::SchemaMismatch {
                    table: name,
                    message: format!(
                        "row {index} has {} values, schema has {} columns",
                        row.len(),
                        schema.len()
                    ),
                });
            }
            for (value, column) in row.iter().zip(schema.columns()) {
                if !value.is_null() && value.column_type() != column.column_type {
                    return Err(PipelineError::SchemaMismatch {
                        table: name,
                        message: format!(
                            "row {index} column '{}' holds a {} value, expected {}",
                            column.name,
                            value.column_type(),
                            column.column_type
                        ),
                    });
                }
            }
        }
        Ok(Self { name, schema, rows })
    }

    /// Creates a table with no rows.
    pub fn empty(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.len()
    }

    /// Returns the column names in declared order.
    pub fn column_names(&self) -> Vec<&str> {
        self.schema.names()
    }

    /// Iterates over the values of one column, or fails if it does not exist.
    pub fn column_values<'a>(&'a self, column: &str) -> Result<impl Iterator<Item = &'a Value>> {
        let index = self
            .schema
            .index_of(column)
            .ok_or_else(|| PipelineError::ColumnNotFound {
                table: self.name.clone(),
                column: column.to_string(),
            })?;
        Ok(self.rows.iter().map(move |row| &row[index]))
    }
}
