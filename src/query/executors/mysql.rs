//! MySQL executor
//!
//! Opens one connection per logical query; the connection lives for the
//! duration of the session and is closed when the session closes.

use std::str::FromStr;

use async_trait::async_trait;
use log::debug;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Number, Value};
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, ConnectOptions, Connection, Executor, Row};

use crate::config::MySqlSettings;
use crate::models::enums::{Backend, SqlParam};
use crate::models::structs::RawRow;
use crate::query::errors::QueryError;
use crate::query::executor::{SqlConnector, SqlSession};

pub struct MySqlExecutor {
    options: MySqlConnectOptions,
}

impl MySqlExecutor {
    pub fn new(settings: &MySqlSettings) -> Result<Self, QueryError> {
        let options = MySqlConnectOptions::from_str(&settings.connection_url())
            .map_err(|e| QueryError::Config(format!("invalid MySQL settings: {}", e)))?;
        Ok(Self { options })
    }
}

#[async_trait]
impl SqlConnector for MySqlExecutor {
    async fn connect(&self) -> Result<Box<dyn SqlSession>, QueryError> {
        let conn = self
            .options
            .connect()
            .await
            .map_err(|e| QueryError::Connect {
                backend: Backend::Sql,
                reason: e.to_string(),
            })?;
        debug!("MySqlExecutor: connection opened");
        Ok(Box::new(MySqlSession { conn: Some(conn) }))
    }
}

pub struct MySqlSession {
    conn: Option<MySqlConnection>,
}

#[async_trait]
impl SqlSession for MySqlSession {
    async fn fetch_all(
        &mut self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<RawRow>, QueryError> {
        let conn = self.conn.as_mut().ok_or_else(|| QueryError::Execution {
            query: sql.to_string(),
            reason: "connection already closed".to_string(),
        })?;
        debug!("MySqlSession: executing with {} params", params.len());
        debug!("SQL: {}", sql);

        // Parameterless statements go over the text protocol; some SHOW
        // statements cannot be prepared.
        let result = if params.is_empty() {
            (&mut *conn).fetch_all(sql).await
        } else {
            bind_params(sqlx::query(sql), params)
                .fetch_all(&mut *conn)
                .await
        };
        let rows = result.map_err(|e| QueryError::Execution {
            query: sql.to_string(),
            reason: e.to_string(),
        })?;

        let data: Vec<RawRow> = rows.iter().map(row_to_json).collect();
        debug!("MySqlSession: query returned {} rows", data.len());
        Ok(data)
    }

    async fn close(&mut self) {
        if let Some(conn) = self.conn.take()
            && let Err(e) = conn.close().await
        {
            debug!("MySqlSession: close failed: {}", e);
        }
    }
}

fn bind_params<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &[SqlParam],
) -> Query<'q, MySql, MySqlArguments> {
    for p in params {
        query = match p {
            SqlParam::Null => query.bind(None::<String>),
            SqlParam::Int(v) => query.bind(*v),
            SqlParam::Float(v) => query.bind(*v),
            SqlParam::Bool(v) => query.bind(*v),
            SqlParam::Text(s) => query.bind(s.clone()),
        };
    }
    query
}

pub(crate) fn row_to_json(row: &MySqlRow) -> RawRow {
    let mut out = RawRow::new();
    for (idx, col) in row.columns().iter().enumerate() {
        out.insert(col.name().to_string(), column_value(row, idx));
    }
    out
}

// Typed decodes in order; the first decode that matches the column type wins.
fn column_value(row: &MySqlRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Decimal>, _>(idx) {
        return v.map(decimal_to_json).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(float_to_json).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return v.map(|f| float_to_json(f as f64)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
        return v
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return v
            .map(|d| Value::String(d.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveTime>, _>(idx) {
        return v
            .map(|t| Value::String(t.to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return v
            .map(|b| Value::String(String::from_utf8_lossy(&b).into_owned()))
            .unwrap_or(Value::Null);
    }
    debug!("MySqlSession: column {} has an unsupported type", idx);
    Value::Null
}

/// Integral decimals (typical of `SUM` over integer columns) become integers.
pub(crate) fn decimal_to_json(d: Decimal) -> Value {
    if d.fract().is_zero()
        && let Some(i) = d.to_i64()
    {
        return Value::from(i);
    }
    d.to_f64().map(float_to_json).unwrap_or(Value::Null)
}

fn float_to_json(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}
