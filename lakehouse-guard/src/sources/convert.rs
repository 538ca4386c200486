//! Conversion of Arrow record batches into runtime-typed tables.

use crate::core::{ColumnDef, ColumnType, RawRecordSet, Row, Schema, Table, Value};
use crate::prelude::*;
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType, Date32Type, Field, Float64Type, Int64Type, Schema as ArrowSchema, TimeUnit,
    TimestampNanosecondType,
};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::temporal_conversions::{date32_to_datetime, timestamp_ns_to_datetime};
use std::path::Path;
use std::sync::Arc;

/// Maps an Arrow data type onto the column type used by [`Table`].
pub(crate) fn column_type_of(data_type: &DataType) -> ColumnType {
    match data_type {
        DataType::Null => ColumnType::Null,
        DataType::Boolean => ColumnType::Boolean,
        dt if dt.is_integer() => ColumnType::Integer,
        dt if dt.is_floating() => ColumnType::Float,
        DataType::Decimal128(_, _) | DataType::Decimal256(_, _) => ColumnType::Float,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => ColumnType::Text,
        DataType::Date32 | DataType::Date64 => ColumnType::Date,
        DataType::Timestamp(_, _) => ColumnType::Timestamp,
        _ => ColumnType::Nested,
    }
}

/// Converts collected batches into a table, preserving column and row order.
pub(crate) fn record_batches_to_table(
    name: &str,
    path: &Path,
    arrow_schema: &ArrowSchema,
    batches: &[RecordBatch],
) -> Result<RawRecordSet> {
    let schema = Schema::new(
        arrow_schema
            .fields()
            .iter()
            .map(|field| ColumnDef::new(field.name(), column_type_of(field.data_type())))
            .collect(),
    );

    let mut rows: Vec<Row> = Vec::new();
    for batch in batches {
        let mut columns = Vec::with_capacity(batch.num_columns());
        for (array, field) in batch.columns().iter().zip(arrow_schema.fields()) {
            let values = column_values(array, field).map_err(|e| {
                PipelineError::source_parse_with_source(
                    path,
                    format!("Cannot read column '{}'", field.name()),
                    Box::new(e),
                )
            })?;
            columns.push(values.into_iter());
        }
        for _ in 0..batch.num_rows() {
            rows.push(
                columns
                    .iter_mut()
                    .map(|column| column.next().unwrap_or(Value::Null))
                    .collect(),
            );
        }
    }

    Table::try_new(name, schema, rows)
}

fn column_values(array: &ArrayRef, field: &Field) -> std::result::Result<Vec<Value>, ArrowError> {
    let len = array.len();
    let values: Vec<Value> = match array.data_type() {
        DataType::Null => vec![Value::Null; len],
        DataType::Boolean => {
            let booleans = array.as_boolean();
            (0..len)
                .map(|i| {
                    if booleans.is_null(i) {
                        Value::Null
                    } else {
                        Value::Bool(booleans.value(i))
                    }
                })
                .collect()
        }
        dt if dt.is_integer() => {
            let casted = cast(array, &DataType::Int64)?;
            let ints = casted.as_primitive::<Int64Type>();
            (0..len)
                .map(|i| {
                    if ints.is_null(i) {
                        Value::Null
                    } else {
                        Value::Int(ints.value(i))
                    }
                })
                .collect()
        }
        dt if dt.is_floating()
            || matches!(dt, DataType::Decimal128(_, _) | DataType::Decimal256(_, _)) =>
        {
            let casted = cast(array, &DataType::Float64)?;
            let floats = casted.as_primitive::<Float64Type>();
            (0..len)
                .map(|i| {
                    if floats.is_null(i) {
                        Value::Null
                    } else {
                        Value::Float(floats.value(i))
                    }
                })
                .collect()
        }
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            let casted = cast(array, &DataType::Utf8)?;
            let strings = casted.as_string::<i32>();
            (0..len)
                .map(|i| {
                    if strings.is_null(i) {
                        Value::Null
                    } else {
                        Value::Text(strings.value(i).to_string())
                    }
                })
                .collect()
        }
        DataType::Date32 | DataType::Date64 => {
            let casted = cast(array, &DataType::Date32)?;
            let dates = casted.as_primitive::<Date32Type>();
            (0..len)
                .map(|i| {
                    if dates.is_null(i) {
                        return Ok(Value::Null);
                    }
                    let days = dates.value(i);
                    date32_to_datetime(days)
                        .map(|dt| Value::Date(dt.date()))
                        .ok_or_else(|| {
                            ArrowError::ComputeError(format!("date out of range: {days}"))
                        })
                })
                .collect::<std::result::Result<_, _>>()?
        }
        DataType::Timestamp(_, _) => {
            let casted = cast(array, &DataType::Timestamp(TimeUnit::Nanosecond, None))?;
            let stamps = casted.as_primitive::<TimestampNanosecondType>();
            (0..len)
                .map(|i| {
                    if stamps.is_null(i) {
                        return Ok(Value::Null);
                    }
                    let nanos = stamps.value(i);
                    timestamp_ns_to_datetime(nanos)
                        .map(Value::Timestamp)
                        .ok_or_else(|| {
                            ArrowError::ComputeError(format!("timestamp out of range: {nanos}"))
                        })
                })
                .collect::<std::result::Result<_, _>>()?
        }
        _ => nested_values(array, field)?,
    };
    Ok(values)
}

/// Renders struct and list columns through the Arrow JSON writer.
fn nested_values(array: &ArrayRef, field: &Field) -> std::result::Result<Vec<Value>, ArrowError> {
    if array.is_empty() {
        return Ok(Vec::new());
    }

    let schema = Arc::new(ArrowSchema::new(vec![field.clone().with_nullable(true)]));
    let batch = RecordBatch::try_new(schema, vec![Arc::clone(array)])?;

    let mut writer = arrow::json::ArrayWriter::new(Vec::new());
    writer.write(&batch)?;
    writer.finish()?;
    let buffer = writer.into_inner();

    let objects: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_slice(&buffer).map_err(|e| ArrowError::JsonError(e.to_string()))?;

    Ok(objects
        .into_iter()
        .map(|mut object| match object.remove(field.name()) {
            None | Some(serde_json::Value::Null) => Value::Null,
            Some(json) => Value::Nested(json),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Date32Array, Float64Array, Int32Array, StringArray, StructArray};
    use chrono::NaiveDate;

    #[test]
    fn test_column_type_mapping() {
        assert_eq!(column_type_of(&DataType::Int32), ColumnType::Integer);
        assert_eq!(column_type_of(&DataType::UInt64), ColumnType::Integer);
        assert_eq!(column_type_of(&DataType::Float32), ColumnType::Float);
        assert_eq!(column_type_of(&DataType::Utf8View), ColumnType::Text);
        assert_eq!(column_type_of(&DataType::Date32), ColumnType::Date);
        assert_eq!(
            column_type_of(&DataType::Timestamp(TimeUnit::Millisecond, None)),
            ColumnType::Timestamp
        );
    }

    #[test]
    fn test_batches_to_table_preserves_order_and_nulls() {
        let schema = ArrowSchema::new(vec![
            Field::new("order_id", DataType::Int32, false),
            Field::new("store_id", DataType::Utf8, true),
            Field::new("date", DataType::Date32, true),
            Field::new("order_value", DataType::Float64, true),
        ]);
        // 2024-06-01 is day 19875 since the epoch
        let batch = RecordBatch::try_new(
            Arc::new(schema.clone()),
            vec![
                Arc::new(Int32Array::from(vec![1, 2])),
                Arc::new(StringArray::from(vec![Some("S1"), None])),
                Arc::new(Date32Array::from(vec![Some(19875), None])),
                Arc::new(Float64Array::from(vec![Some(10.0), Some(2.5)])),
            ],
        )
        .unwrap();

        let table =
            record_batches_to_table("erp_orders", Path::new("erp.csv"), &schema, &[batch]).unwrap();

        assert_eq!(
            table.column_names(),
            vec!["order_id", "store_id", "date", "order_value"]
        );
        assert_eq!(table.num_rows(), 2);
        assert_eq!(
            table.rows()[0],
            vec![
                Value::Int(1),
                Value::from("S1"),
                Value::Date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
                Value::Float(10.0),
            ]
        );
        assert_eq!(table.rows()[1][1], Value::Null);
        assert_eq!(table.rows()[1][2], Value::Null);
    }

    #[test]
    fn test_struct_column_becomes_nested_json() {
        let utm: ArrayRef = Arc::new(StringArray::from(vec![Some("mail"), Some("ads")]));
        let metadata = StructArray::from(vec![(
            Arc::new(Field::new("utm", DataType::Utf8, true)),
            utm,
        )]);
        let field = Field::new("metadata", metadata.data_type().clone(), true);
        let schema = ArrowSchema::new(vec![field]);
        let batch = RecordBatch::try_new(Arc::new(schema.clone()), vec![Arc::new(metadata)])
            .unwrap();

        let table =
            record_batches_to_table("web_events", Path::new("web.json"), &schema, &[batch])
                .unwrap();

        assert_eq!(
            table.schema().columns()[0].column_type,
            ColumnType::Nested
        );
        assert_eq!(
            table.rows()[0][0],
            Value::Nested(serde_json::json!({"utm": "mail"}))
        );
    }

    #[test]
    fn test_empty_batches_keep_schema() {
        let schema = ArrowSchema::new(vec![Field::new("lead_id", DataType::Int64, true)]);
        let table =
            record_batches_to_table("crm_leads", Path::new("crm.csv"), &schema, &[]).unwrap();
        assert_eq!(table.column_names(), vec!["lead_id"]);
        assert_eq!(table.num_rows(), 0);
    }
}
