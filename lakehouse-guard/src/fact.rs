//! Fact aggregation into `fct_daily_store_metrics`.

use crate::core::{ColumnDef, ColumnType, Schema, Table};
use crate::prelude::*;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Name of the fact table and of its artifact.
pub const FACT_TABLE_NAME: &str = "fct_daily_store_metrics";

/// Fact column names, in output order.
pub const FACT_COLUMNS: [&str; 6] = [
    "store_id",
    "date",
    "revenue",
    "order_count",
    "converted_leads",
    "sessions",
];

/// Daily metrics of one store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactRow {
    pub store_id: String,
    pub date: NaiveDate,
    pub revenue: f64,
    pub order_count: u64,
    pub converted_leads: u64,
    pub sessions: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Metrics {
    revenue: f64,
    order_count: u64,
    converted_leads: u64,
    sessions: u64,
}

/// One row per `(store_id, date)`, sorted by that key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FactTable {
    rows: Vec<FactRow>,
}

impl FactTable {
    pub fn rows(&self) -> &[FactRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Looks up the row of a store and day.
    pub fn get(&self, store_id: &str, date: NaiveDate) -> Option<&FactRow> {
        self.rows
            .binary_search_by(|row| (row.store_id.as_str(), row.date).cmp(&(store_id, date)))
            .ok()
            .map(|index| &self.rows[index])
    }

    /// Converts the facts into a generic [`Table`] for writing.
    pub fn to_table(&self) -> Result<Table> {
        let schema = Schema::new(vec![
            ColumnDef::new("store_id", ColumnType::Text),
            ColumnDef::new("date", ColumnType::Date),
            ColumnDef::new("revenue", ColumnType::Float),
            ColumnDef::new("order_count", ColumnType::Integer),
            ColumnDef::new("converted_leads", ColumnType::Integer),
            ColumnDef::new("sessions", ColumnType::Integer),
        ]);
        let rows = self
            .rows
            .iter()
            .map(|row| {
                vec![
                    Value::Text(row.store_id.clone()),
                    Value::Date(row.date),
                    Value::Float(row.revenue),
                    Value::Int(row.order_count as i64),
                    Value::Int(row.converted_leads as i64),
                    Value::Int(row.sessions as i64),
                ]
            })
            .collect();
        Table::try_new(FACT_TABLE_NAME, schema, rows)
    }
}

type Key = (String, NaiveDate);

/// Aggregates staging tables into daily store metrics.
///
/// * `stg_erp_orders`: `revenue` sums `order_value`, `order_count` counts `order_id`
/// * `stg_crm_leads`: `converted_leads` counts rows whose `status` is `converted`
/// * `stg_web_events`: `sessions` counts `event_id`
///
/// The per-source results are outer-joined on `(store_id, date)` and missing
/// metrics are zero. A missing staging table contributes nothing and rows
/// without a `store_id` are not grouped. Output does not depend on the order
/// in which domains were staged.
///
/// # Examples
///
/// ```rust
/// use lakehouse_guard::fact::aggregate;
/// use std::collections::BTreeMap;
///
/// let fact = aggregate(&BTreeMap::new()).unwrap();
/// assert!(fact.is_empty());
/// ```
#[instrument(skip(staging), fields(tables = staging.len()))]
pub fn aggregate(staging: &BTreeMap<String, StagingTable>) -> Result<FactTable> {
    let mut metrics: BTreeMap<Key, Metrics> = BTreeMap::new();

    if let Some(orders) = staging.get(Domain::Erp.staging_table()) {
        let order_ids = column_index(orders, "order_id")?;
        let values = column_index(orders, "order_value")?;
        for_each_keyed_row(orders, |key, row| {
            let entry = metrics.entry(key).or_default();
            if let Some(value) = row[values].as_f64() {
                entry.revenue += value;
            }
            if !row[order_ids].is_null() {
                entry.order_count += 1;
            }
        })?;
    }

    if let Some(leads) = staging.get(Domain::Crm.staging_table()) {
        let status = column_index(leads, "status")?;
        for_each_keyed_row(leads, |key, row| {
            let entry = metrics.entry(key).or_default();
            if row[status].as_str() == Some("converted") {
                entry.converted_leads += 1;
            }
        })?;
    }

    if let Some(events) = staging.get(Domain::Web.staging_table()) {
        let event_ids = column_index(events, "event_id")?;
        for_each_keyed_row(events, |key, row| {
            let entry = metrics.entry(key).or_default();
            if !row[event_ids].is_null() {
                entry.sessions += 1;
            }
        })?;
    }

    let rows: Vec<FactRow> = metrics
        .into_iter()
        .map(|((store_id, date), m)| FactRow {
            store_id,
            date,
            revenue: m.revenue,
            order_count: m.order_count,
            converted_leads: m.converted_leads,
            sessions: m.sessions,
        })
        .collect();

    debug!(rows = rows.len(), "Aggregated fact table");
    Ok(FactTable { rows })
}

fn column_index(table: &StagingTable, column: &str) -> Result<usize> {
    table
        .schema()
        .index_of(column)
        .ok_or_else(|| PipelineError::ColumnNotFound {
            table: table.name().to_string(),
            column: column.to_string(),
        })
}

/// Calls `f` with the grouping key of every row that has a `store_id`.
fn for_each_keyed_row<F>(table: &StagingTable, mut f: F) -> Result<()>
where
    F: FnMut(Key, &[Value]),
{
    let store = column_index(table, "store_id")?;
    let date = column_index(table, "date")?;

    for (index, row) in table.rows().iter().enumerate() {
        if row[store].is_null() {
            continue;
        }
        let day = match &row[date] {
            Value::Date(day) => *day,
            other => {
                return Err(PipelineError::SchemaMismatch {
                    table: table.name().to_string(),
                    message: format!("row {index} has non-date value '{other}' in 'date'"),
                })
            }
        };
        f((row[store].to_text(), day), row);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{crm_leads, erp_orders, staged, web_events};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_single_order_defaults_other_metrics() {
        let staging = staged(vec![(
            Domain::Erp,
            erp_orders(&[(1, "S1", "2024-06-01", 10.0)]),
        )]);
        let fact = aggregate(&staging).unwrap();
        assert_eq!(
            fact.rows(),
            &[FactRow {
                store_id: "S1".to_string(),
                date: day("2024-06-01"),
                revenue: 10.0,
                order_count: 1,
                converted_leads: 0,
                sessions: 0,
            }]
        );
    }

    #[test]
    fn test_outer_join_and_sorting() {
        let staging = staged(vec![
            (
                Domain::Erp,
                erp_orders(&[
                    (1, "S2", "2024-06-01", 5.0),
                    (2, "S1", "2024-06-02", 2.5),
                    (3, "S1", "2024-06-02", 7.5),
                ]),
            ),
            (
                Domain::Crm,
                crm_leads(&[
                    ("S1", "2024-06-01", "converted"),
                    ("S1", "2024-06-01", "new"),
                    ("S1", "2024-06-02", "converted"),
                ]),
            ),
            (Domain::Web, web_events(&[("S3", "2024-06-01"), ("S3", "2024-06-01")])),
        ]);

        let fact = aggregate(&staging).unwrap();
        let keys: Vec<(&str, NaiveDate)> = fact
            .rows()
            .iter()
            .map(|r| (r.store_id.as_str(), r.date))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("S1", day("2024-06-01")),
                ("S1", day("2024-06-02")),
                ("S2", day("2024-06-01")),
                ("S3", day("2024-06-01")),
            ]
        );

        let s1 = fact.get("S1", day("2024-06-02")).unwrap();
        assert_eq!(s1.revenue, 10.0);
        assert_eq!(s1.order_count, 2);
        assert_eq!(s1.converted_leads, 1);

        let leads_only = fact.get("S1", day("2024-06-01")).unwrap();
        assert_eq!(leads_only.order_count, 0);
        assert_eq!(leads_only.converted_leads, 1);

        let web_only = fact.get("S3", day("2024-06-01")).unwrap();
        assert_eq!(
            (web_only.revenue, web_only.order_count, web_only.converted_leads, web_only.sessions),
            (0.0, 0, 0, 2)
        );
    }

    #[test]
    fn test_null_order_value_still_counts_order() {
        let mut orders = erp_orders(&[(1, "S1", "2024-06-01", 4.0)]);
        let mut rows = orders.rows().to_vec();
        let mut extra = rows[0].clone();
        extra[0] = Value::Int(2);
        extra[4] = Value::Null;
        rows.push(extra);
        orders = Table::try_new(orders.name(), orders.schema().clone(), rows).unwrap();

        let fact = aggregate(&staged(vec![(Domain::Erp, orders)])).unwrap();
        assert_eq!(fact.rows()[0].revenue, 4.0);
        assert_eq!(fact.rows()[0].order_count, 2);
    }

    #[test]
    fn test_to_table_column_order() {
        let staging = staged(vec![(
            Domain::Web,
            web_events(&[("S1", "2024-06-01")]),
        )]);
        let table = aggregate(&staging).unwrap().to_table().unwrap();
        assert_eq!(table.name(), FACT_TABLE_NAME);
        assert_eq!(table.column_names(), FACT_COLUMNS.to_vec());
        assert_eq!(table.rows()[0][5], Value::Int(1));
    }
}
