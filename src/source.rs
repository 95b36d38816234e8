//! Read-only source adapters.
//!
//! The reconciliation core only requires that a source produce rectangular
//! snapshots with named columns; [`SnapshotSource`] is that seam. The one
//! production implementation wraps the Mindat MySQL replica.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mysql_async::consts::ColumnType;
use mysql_async::prelude::Queryable;
use reconcile_core::{Snapshot, Value};
use rust_decimal::Decimal;

/// A read-only store that can be snapshotted one query at a time.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, entity: &str, query: &str) -> anyhow::Result<Snapshot>;
}

/// Mindat MySQL source.
pub struct MindatSource {
    pool: mysql_async::Pool,
}

impl MindatSource {
    pub fn connect(url: &str) -> Result<Self, mysql_async::Error> {
        Ok(MindatSource {
            pool: mysql_async::Pool::from_url(url)?,
        })
    }

    pub async fn disconnect(self) -> Result<(), mysql_async::Error> {
        self.pool.disconnect().await
    }
}

#[async_trait]
impl SnapshotSource for MindatSource {
    async fn fetch(&self, entity: &str, query: &str) -> anyhow::Result<Snapshot> {
        let mut conn = self.pool.get_conn().await?;
        // Binary protocol so numeric columns arrive typed instead of as text
        let rows: Vec<mysql_async::Row> = conn.exec(query, ()).await?;

        let columns: Vec<String> = rows
            .first()
            .map(|row| {
                row.columns_ref()
                    .iter()
                    .map(|c| c.name_str().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let mut converted = Vec::with_capacity(rows.len());
        for row in rows {
            let column_types: Vec<ColumnType> = row
                .columns_ref()
                .iter()
                .map(|c| c.column_type())
                .collect();
            let raw = row.unwrap();
            converted.push(
                raw.into_iter()
                    .zip(column_types)
                    .map(|(value, ty)| convert_mysql_value(value, ty))
                    .collect(),
            );
        }

        Ok(Snapshot::new(entity, columns, converted))
    }
}

/// Convert one MySQL cell to a [`Value`].
fn convert_mysql_value(value: mysql_async::Value, ty: ColumnType) -> Value {
    match value {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Int(i) => Value::Int(i),
        mysql_async::Value::UInt(u) => Value::Int(u as i64),
        mysql_async::Value::Float(f) => Value::Float(f as f64),
        mysql_async::Value::Double(d) => Value::Float(d),
        mysql_async::Value::Bytes(bytes) => {
            let s = String::from_utf8_lossy(&bytes).into_owned();
            match ty {
                // DECIMAL comes over the wire as text
                ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
                    s.parse::<Decimal>().map(Value::Decimal).unwrap_or(Value::Text(s))
                }
                _ => Value::Text(s),
            }
        }
        mysql_async::Value::Date(year, month, day, hour, minute, second, micros) => {
            match NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
                .and_then(|d| d.and_hms_micro_opt(hour as u32, minute as u32, second as u32, micros))
            {
                Some(naive) => {
                    Value::Timestamp(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
                }
                // zero-dates and other out-of-range values
                None => Value::Null,
            }
        }
        mysql_async::Value::Time(negative, days, hours, minutes, seconds, _micros) => {
            let sign = if negative { "-" } else { "" };
            Value::Text(format!(
                "{sign}{:02}:{minutes:02}:{seconds:02}",
                u32::from(hours) + days * 24
            ))
        }
    }
}
