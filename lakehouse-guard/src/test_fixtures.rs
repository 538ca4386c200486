//! Common test fixtures for staging and aggregation scenarios.
//!
//! Raw tables are built in memory with column types inferred from the first
//! non-null value of each column.

use crate::core::{ColumnDef, ColumnType, Domain, RawRecordSet, Row, Schema, StagingTable, Table, Value};
use crate::staging::{stage_domain, DEFAULT_DATE_COLUMN};
use std::collections::BTreeMap;

/// Builds a raw table, inferring each column type from its values.
///
/// Panics when the rows do not fit the inferred schema.
pub fn raw_table(name: &str, columns: &[&str], rows: Vec<Row>) -> RawRecordSet {
    let defs = columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let column_type = rows
                .iter()
                .map(|row| &row[index])
                .find(|value| !value.is_null())
                .map_or(ColumnType::Null, Value::column_type);
            ColumnDef::new(*column, column_type)
        })
        .collect();
    Table::try_new(name, Schema::new(defs), rows).expect("fixture rows must fit the schema")
}

/// Raw ERP orders from `(order_id, store_id, date, order_value)` tuples.
pub fn erp_orders(orders: &[(i64, &str, &str, f64)]) -> RawRecordSet {
    raw_table(
        "erp_orders",
        &["order_id", "customer_id", "store_id", "date", "order_value", "status"],
        orders
            .iter()
            .map(|&(order_id, store_id, date, value)| {
                vec![
                    Value::Int(order_id),
                    Value::Text(format!("C{order_id}")),
                    Value::from(store_id),
                    Value::from(date),
                    Value::Float(value),
                    Value::from("paid"),
                ]
            })
            .collect(),
    )
}

/// Raw CRM leads from `(store_id, date, status)` tuples.
pub fn crm_leads(leads: &[(&str, &str, &str)]) -> RawRecordSet {
    raw_table(
        "crm_leads",
        &["lead_id", "name", "email", "source", "status", "store_id", "date"],
        leads
            .iter()
            .enumerate()
            .map(|(index, &(store_id, date, status))| {
                vec![
                    Value::Int(index as i64 + 1),
                    Value::Text(format!("Lead {index}")),
                    Value::Text(format!("lead{index}@example.com")),
                    Value::from("ads"),
                    Value::from(status),
                    Value::from(store_id),
                    Value::from(date),
                ]
            })
            .collect(),
    )
}

/// Raw web events from `(store_id, date)` tuples, one event each.
pub fn web_events(events: &[(&str, &str)]) -> RawRecordSet {
    raw_table(
        "web_events",
        &["event_id", "visitor_id", "store_id", "date", "page", "event_type", "metadata"],
        events
            .iter()
            .enumerate()
            .map(|(index, &(store_id, date))| {
                vec![
                    Value::Text(format!("e{index}")),
                    Value::Text(format!("v{index}")),
                    Value::from(store_id),
                    Value::from(date),
                    Value::from("/home"),
                    Value::from("page_view"),
                    Value::Nested(serde_json::json!({"utm": "mail"})),
                ]
            })
            .collect(),
    )
}

/// Raw products from `(product_id, store_id, date)` tuples.
pub fn products(items: &[(i64, &str, &str)]) -> RawRecordSet {
    raw_table(
        "products",
        &["product_id", "name", "category", "price", "active", "store_id", "date"],
        items
            .iter()
            .map(|&(product_id, store_id, date)| {
                vec![
                    Value::Int(product_id),
                    Value::Text(format!("Product {product_id}")),
                    Value::from("general"),
                    Value::Float(9.99),
                    Value::Bool(true),
                    Value::from(store_id),
                    Value::from(date),
                ]
            })
            .collect(),
    )
}

/// Stages the given raw tables, keyed by staging table name.
///
/// Panics when staging fails.
pub fn staged(raw: Vec<(Domain, RawRecordSet)>) -> BTreeMap<String, StagingTable> {
    raw.into_iter()
        .map(|(domain, records)| {
            let table = stage_domain(domain, &records, DEFAULT_DATE_COLUMN)
                .expect("fixture must stage");
            (domain.staging_table().to_string(), table)
        })
        .collect()
}
