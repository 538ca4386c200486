//! Staging normalizer.
//!
//! Each domain's raw records are projected onto a fixed column list and a few
//! columns are cast to their staging types:
//!
//! | domain | table | columns |
//! |---|---|---|
//! | erp | `stg_erp_orders` | order_id, customer_id, store_id, date, order_value, status |
//! | crm | `stg_crm_leads` | lead_id, name, email, source, status, store_id, date |
//! | product | `stg_products` | product_id, name, category, price, active, store_id, date |
//! | web | `stg_web_events` | event_id, visitor_id, store_id, date, page, event_type, metadata |
//!
//! `order_id` becomes an integer, `order_value` a float and `date` a calendar
//! date with any time of day dropped. Other columns keep their raw type. A
//! domain's staging step only ever reads that domain's records.

use crate::core::{ColumnDef, ColumnType, Row, Schema, Table};
use crate::prelude::*;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Raw date column name used when none is configured.
pub const DEFAULT_DATE_COLUMN: &str = "date";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coercion {
    Keep,
    Integer,
    Float,
    Date,
}

const ERP_COLUMNS: &[(&str, Coercion)] = &[
    ("order_id", Coercion::Integer),
    ("customer_id", Coercion::Keep),
    ("store_id", Coercion::Keep),
    ("date", Coercion::Date),
    ("order_value", Coercion::Float),
    ("status", Coercion::Keep),
];

const CRM_COLUMNS: &[(&str, Coercion)] = &[
    ("lead_id", Coercion::Keep),
    ("name", Coercion::Keep),
    ("email", Coercion::Keep),
    ("source", Coercion::Keep),
    ("status", Coercion::Keep),
    ("store_id", Coercion::Keep),
    ("date", Coercion::Date),
];

const PRODUCT_COLUMNS: &[(&str, Coercion)] = &[
    ("product_id", Coercion::Keep),
    ("name", Coercion::Keep),
    ("category", Coercion::Keep),
    ("price", Coercion::Keep),
    ("active", Coercion::Keep),
    ("store_id", Coercion::Keep),
    ("date", Coercion::Date),
];

const WEB_COLUMNS: &[(&str, Coercion)] = &[
    ("event_id", Coercion::Keep),
    ("visitor_id", Coercion::Keep),
    ("store_id", Coercion::Keep),
    ("date", Coercion::Date),
    ("page", Coercion::Keep),
    ("event_type", Coercion::Keep),
    ("metadata", Coercion::Keep),
];

fn staging_columns(domain: Domain) -> &'static [(&'static str, Coercion)] {
    match domain {
        Domain::Erp => ERP_COLUMNS,
        Domain::Crm => CRM_COLUMNS,
        Domain::Web => WEB_COLUMNS,
        Domain::Product => PRODUCT_COLUMNS,
    }
}

/// Column names of a domain's staging table, in order.
pub fn staging_column_names(domain: Domain) -> Vec<&'static str> {
    staging_columns(domain).iter().map(|(name, _)| *name).collect()
}

/// Stages one domain's records.
///
/// `date_column` names the raw column holding the record date; it is always
/// emitted as `date`.
///
/// # Examples
///
/// ```rust
/// use lakehouse_guard::core::{ColumnDef, ColumnType, Domain, Schema, Table, Value};
/// use lakehouse_guard::staging::stage_domain;
///
/// let raw = Table::try_new(
///     "web_events",
///     Schema::new(vec![
///         ColumnDef::new("event_id", ColumnType::Text),
///         ColumnDef::new("visitor_id", ColumnType::Text),
///         ColumnDef::new("store_id", ColumnType::Text),
///         ColumnDef::new("ts", ColumnType::Text),
///         ColumnDef::new("page", ColumnType::Text),
///         ColumnDef::new("event_type", ColumnType::Text),
///         ColumnDef::new("metadata", ColumnType::Nested),
///     ]),
///     vec![vec![
///         Value::from("e1"), Value::from("v1"), Value::from("S1"),
///         Value::from("2024-06-01T09:30:00"), Value::from("/"),
///         Value::from("page_view"), Value::Null,
///     ]],
/// )
/// .unwrap();
///
/// let staged = stage_domain(Domain::Web, &raw, "ts").unwrap();
/// assert_eq!(staged.name(), "stg_web_events");
/// assert_eq!(staged.rows()[0][3].to_string(), "2024-06-01");
/// ```
#[instrument(skip(records), fields(dataset = %records.name(), rows = records.num_rows()))]
pub fn stage_domain(
    domain: Domain,
    records: &RawRecordSet,
    date_column: &str,
) -> Result<StagingTable> {
    let table_name = domain.staging_table();
    let columns = staging_columns(domain);

    let mut indices = Vec::with_capacity(columns.len());
    let mut defs = Vec::with_capacity(columns.len());
    for &(name, coercion) in columns {
        let raw_name = if name == "date" { date_column } else { name };
        let index = records
            .schema()
            .index_of(raw_name)
            .ok_or_else(|| PipelineError::ColumnNotFound {
                table: records.name().to_string(),
                column: raw_name.to_string(),
            })?;
        let column_type = match coercion {
            Coercion::Keep => records.schema().columns()[index].column_type,
            Coercion::Integer => ColumnType::Integer,
            Coercion::Float => ColumnType::Float,
            Coercion::Date => ColumnType::Date,
        };
        indices.push(index);
        defs.push(ColumnDef::new(name, column_type));
    }

    let rows = records
        .rows()
        .iter()
        .enumerate()
        .map(|(row_index, raw)| {
            columns
                .iter()
                .zip(&indices)
                .map(|(&(name, coercion), &index)| {
                    coerce(&raw[index], coercion).map_err(|message| {
                        PipelineError::coercion(table_name, name, row_index, message)
                    })
                })
                .collect::<Result<Row>>()
        })
        .collect::<Result<Vec<_>>>()?;

    let table = Table::try_new(table_name, Schema::new(defs), rows)?;
    debug!(table = table_name, rows = table.num_rows(), "Staged domain");
    Ok(table)
}

/// Stages every domain present in `raw_frames`, keyed by staging table name.
///
/// Raw dates are read from the [`DEFAULT_DATE_COLUMN`].
pub fn stage(raw_frames: &BTreeMap<Domain, RawRecordSet>) -> Result<BTreeMap<String, StagingTable>> {
    raw_frames
        .iter()
        .map(|(domain, records)| {
            stage_domain(*domain, records, DEFAULT_DATE_COLUMN)
                .map(|table| (domain.staging_table().to_string(), table))
        })
        .collect()
}

fn coerce(value: &Value, coercion: Coercion) -> std::result::Result<Value, String> {
    match coercion {
        Coercion::Keep => Ok(value.clone()),
        Coercion::Integer => to_integer(value),
        Coercion::Float => to_float(value),
        Coercion::Date => to_date(value),
    }
}

fn to_integer(value: &Value) -> std::result::Result<Value, String> {
    match value {
        Value::Int(v) => Ok(Value::Int(*v)),
        Value::Float(f) => integral(*f).ok_or_else(|| format!("{f:?} is not an integer")),
        Value::Text(s) => {
            let trimmed = s.trim();
            if let Ok(v) = trimmed.parse::<i64>() {
                return Ok(Value::Int(v));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(integral)
                .ok_or_else(|| format!("'{s}' is not an integer"))
        }
        Value::Null => Err("null cannot be cast to an integer".to_string()),
        other => Err(format!("{} value '{other}' is not an integer", other.column_type())),
    }
}

/// Whole floats within the `i64` range; `i64::MAX as f64` rounds up to 2^63.
fn integral(f: f64) -> Option<Value> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f)).then(|| Value::Int(f as i64))
}

fn to_float(value: &Value) -> std::result::Result<Value, String> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Int(v) => Ok(Value::Float(*v as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| format!("'{s}' is not a number")),
        other => Err(format!("{} value '{other}' is not a number", other.column_type())),
    }
}

fn to_date(value: &Value) -> std::result::Result<Value, String> {
    match value {
        Value::Date(d) => Ok(Value::Date(*d)),
        Value::Timestamp(ts) => Ok(Value::Date(ts.date())),
        Value::Text(s) => parse_date(s.trim())
            .map(Value::Date)
            .ok_or_else(|| format!("'{s}' is not a date")),
        Value::Null => Err("null cannot be cast to a date".to_string()),
        other => Err(format!("{} value '{other}' is not a date", other.column_type())),
    }
}

/// Parses a calendar date from ISO date, datetime or RFC 3339 text.
pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| parse_datetime(text).map(|dt| dt.date()))
}

/// Parses datetime text; RFC 3339 values keep their local wall-clock time.
pub(crate) fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_local())
        })
}
