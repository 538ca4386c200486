//! Core data types shared by every pipeline stage.
//!
//! Records are runtime-typed: a [`Table`] pairs an ordered [`Schema`] of typed
//! column descriptors with fixed-arity rows of [`Value`]s. Raw datasets and
//! staging tables use the same representation, so the expectation engine,
//! normalizer and writer all work against one shape.
//!
//! ```text
//! Table "erp_orders"
//!     ├── Schema: order_id:integer, store_id:text, date:date, ...
//!     └── Rows:   [1, "S1", 2024-06-01, ...]
//! ```
//!
//! ## Example
//!
//! ```rust
//! use lakehouse_guard::core::{ColumnDef, ColumnType, Schema, Table, Value};
//!
//! let schema = Schema::new(vec![
//!     ColumnDef::new("order_id", ColumnType::Integer),
//!     ColumnDef::new("store_id", ColumnType::Text),
//! ]);
//! let table = Table::try_new("erp_orders", schema, vec![vec![Value::Int(1), Value::from("S1")]])?;
//! assert_eq!(table.column_names(), vec!["order_id", "store_id"]);
//! # Ok::<(), lakehouse_guard::error::PipelineError>(())
//! ```

mod domain;
mod table;
mod value;

pub use domain::Domain;
pub use table::{ColumnDef, RawRecordSet, Row, Schema, StagingTable, Table};
pub use value::{ColumnType, Value};
