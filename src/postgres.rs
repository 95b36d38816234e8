//! Row and parameter conversion for the target store.
//!
//! Two directions:
//!
//! - fetched [`tokio_postgres::Row`]s become [`Value`] cells for snapshots
//!   and RETURNING row sets;
//! - [`Value`] cells bind back into batched statements through the
//!   [`SqlValue`] wrapper, with nulls passed as SQL NULL (never a string
//!   placeholder) and numeric widths adapted to the statement's inferred
//!   parameter types.

use crate::error::SyncError;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use reconcile_core::{RowSet, Snapshot, Value};
use rust_decimal::Decimal;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::{Column, Row};

/// Convert a fetched result into a snapshot of one target entity.
pub fn rows_to_snapshot(
    entity: &str,
    columns: &[Column],
    rows: &[Row],
) -> Result<Snapshot, SyncError> {
    let names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
    let mut converted = Vec::with_capacity(rows.len());
    for row in rows {
        converted.push(convert_row(entity, row)?);
    }
    Ok(Snapshot::new(entity, names, converted))
}

/// Convert RETURNING rows into the row set recorded by the audit reporter.
pub fn rows_to_rowset(entity: &str, columns: &[Column], rows: &[Row]) -> Result<RowSet, SyncError> {
    let mut set = RowSet::new(columns.iter().map(|c| c.name().to_string()).collect());
    for row in rows {
        set.push(convert_row(entity, row)?);
    }
    Ok(set)
}

fn convert_row(entity: &str, row: &Row) -> Result<Vec<Value>, SyncError> {
    let mut values = Vec::with_capacity(row.columns().len());
    for (i, column) in row.columns().iter().enumerate() {
        values.push(convert_value(entity, row, i, column)?);
    }
    Ok(values)
}

/// Convert one PostgreSQL cell to a [`Value`].
fn convert_value(entity: &str, row: &Row, index: usize, column: &Column) -> Result<Value, SyncError> {
    let ty = column.type_();
    match *ty {
        Type::BOOL => Ok(match row.try_get::<_, Option<bool>>(index)? {
            Some(b) => Value::Bool(b),
            None => Value::Null,
        }),
        Type::INT2 => Ok(match row.try_get::<_, Option<i16>>(index)? {
            Some(i) => Value::Int(i as i64),
            None => Value::Null,
        }),
        Type::INT4 => Ok(match row.try_get::<_, Option<i32>>(index)? {
            Some(i) => Value::Int(i as i64),
            None => Value::Null,
        }),
        Type::INT8 => Ok(match row.try_get::<_, Option<i64>>(index)? {
            Some(i) => Value::Int(i),
            None => Value::Null,
        }),
        Type::FLOAT4 => Ok(match row.try_get::<_, Option<f32>>(index)? {
            Some(f) => Value::Float(f as f64),
            None => Value::Null,
        }),
        Type::FLOAT8 => Ok(match row.try_get::<_, Option<f64>>(index)? {
            Some(f) => Value::Float(f),
            None => Value::Null,
        }),
        Type::NUMERIC => Ok(match row.try_get::<_, Option<Decimal>>(index)? {
            Some(d) => Value::Decimal(d),
            None => Value::Null,
        }),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            Ok(match row.try_get::<_, Option<String>>(index)? {
                Some(s) => Value::Text(s),
                None => Value::Null,
            })
        }
        Type::TIMESTAMP => Ok(match row.try_get::<_, Option<NaiveDateTime>>(index)? {
            Some(ts) => Value::Timestamp(DateTime::<Utc>::from_naive_utc_and_offset(ts, Utc)),
            None => Value::Null,
        }),
        Type::TIMESTAMPTZ => Ok(match row.try_get::<_, Option<DateTime<Utc>>>(index)? {
            Some(ts) => Value::Timestamp(ts),
            None => Value::Null,
        }),
        Type::JSON | Type::JSONB => Ok(match row.try_get::<_, Option<serde_json::Value>>(index)? {
            Some(json) => Value::Json(json),
            None => Value::Null,
        }),
        Type::UUID => Ok(match row.try_get::<_, Option<uuid::Uuid>>(index)? {
            Some(u) => Value::Uuid(u),
            None => Value::Null,
        }),
        _ => {
            // For unknown types, try to get as string
            if let Ok(val) = row.try_get::<_, Option<String>>(index) {
                Ok(val.map_or(Value::Null, Value::Text))
            } else {
                Err(SyncError::UnsupportedColumn {
                    entity: entity.to_string(),
                    column: column.name().to_string(),
                    ty: ty.to_string(),
                })
            }
        }
    }
}

/// Binds a [`Value`] as a statement parameter.
///
/// The batched statements mix two parameter styles: plain `INSERT … VALUES`
/// forms where the server infers real column types, and `(VALUES …)` join
/// forms whose parameters come through as text and are cast in the SQL.
/// Binding therefore adapts to the inferred type instead of assuming one.
#[derive(Debug)]
pub struct SqlValue<'a>(pub &'a Value);

impl ToSql for SqlValue<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => match *ty {
                Type::TEXT | Type::VARCHAR | Type::UNKNOWN => b.to_string().to_sql(&Type::TEXT, out),
                _ => b.to_sql(ty, out),
            },
            Value::Int(i) => match *ty {
                Type::INT2 => (*i as i16).to_sql(ty, out),
                Type::INT4 => (*i as i32).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::UNKNOWN => i.to_string().to_sql(&Type::TEXT, out),
                _ => i.to_sql(ty, out),
            },
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::UNKNOWN => f.to_string().to_sql(&Type::TEXT, out),
                _ => f.to_sql(ty, out),
            },
            Value::Decimal(d) => match *ty {
                Type::TEXT | Type::VARCHAR | Type::UNKNOWN => d.to_string().to_sql(&Type::TEXT, out),
                _ => d.to_sql(ty, out),
            },
            Value::Text(s) => s.to_sql(ty, out),
            Value::Timestamp(ts) => match *ty {
                Type::TIMESTAMP => ts.naive_utc().to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::UNKNOWN => {
                    ts.to_rfc3339().to_sql(&Type::TEXT, out)
                }
                _ => ts.to_sql(ty, out),
            },
            Value::Uuid(u) => match *ty {
                Type::TEXT | Type::VARCHAR | Type::UNKNOWN => u.to_string().to_sql(&Type::TEXT, out),
                _ => u.to_sql(ty, out),
            },
            Value::Json(j) => match *ty {
                Type::TEXT | Type::VARCHAR | Type::UNKNOWN => j.to_string().to_sql(&Type::TEXT, out),
                _ => j.to_sql(ty, out),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // Acceptance is decided per-value in to_sql; the statements cast
        // where the server cannot infer.
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_null_binds_as_sql_null() {
        let mut buf = BytesMut::new();
        let result = SqlValue(&Value::Null).to_sql(&Type::TEXT, &mut buf).unwrap();
        assert!(matches!(result, IsNull::Yes));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_sql_value_int_adapts_to_inferred_width() {
        for ty in [Type::INT2, Type::INT4, Type::INT8, Type::TEXT] {
            let mut buf = BytesMut::new();
            let result = SqlValue(&Value::Int(1820)).to_sql(&ty, &mut buf).unwrap();
            assert!(matches!(result, IsNull::No));
            assert!(!buf.is_empty());
        }
    }
}
