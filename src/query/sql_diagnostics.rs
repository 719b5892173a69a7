//! Relational execution with best-effort engine diagnostics.
//!
//! Only the primary execute+fetch can fail a request. Session counters,
//! plan explanation and the rows-examined estimate each degrade to `None`
//! on their own.

use std::time::{Duration, Instant};

use log::{Level, debug, log_enabled, warn};
use serde_json::Value;

use super::bound_sql::BoundSql;
use super::errors::QueryError;
use super::executor::{SqlConnector, SqlSession};
use super::logical::SqlStatement;
use super::{elapsed_ms, round_ms};
use crate::models::enums::ExplainType;
use crate::models::structs::{ExecutionResult, RawRow, SqlDiagnostics};

pub const ROWS_EXAMINED_COUNTER: &str = "Rows_examined";
pub const ROWS_SENT_COUNTER: &str = "Rows_sent";

/// Numeric plan fields summed for the rows-examined estimate.
const PLAN_ROW_KEYS: [&str; 3] = ["rows", "rows_examined_per_scan", "rows_produced_per_join"];

/// Execute+fetch on a fresh connection, timed, without diagnostics.
pub async fn run_plain(
    connector: &dyn SqlConnector,
    stmt: &SqlStatement,
) -> Result<ExecutionResult, QueryError> {
    let mut session = connector.connect().await?;
    let start = Instant::now();
    let outcome = session.fetch_all(&stmt.text, &stmt.params).await;
    let execution_ms = elapsed_ms(start);
    session.close().await;
    let rows = outcome?;
    Ok(ExecutionResult { rows, execution_ms })
}

/// Execute+fetch on a fresh connection and collect diagnostics around it.
pub async fn run_with_diagnostics(
    connector: &dyn SqlConnector,
    stmt: &SqlStatement,
) -> Result<(ExecutionResult, SqlDiagnostics), QueryError> {
    let total_start = Instant::now();
    let mut session = connector.connect().await?;
    let outcome = diagnose(session.as_mut(), stmt).await;
    session.close().await;
    let (result, mut diagnostics) = outcome?;
    diagnostics.total_ms = elapsed_ms(total_start);
    Ok((result, diagnostics))
}

async fn diagnose(
    session: &mut dyn SqlSession,
    stmt: &SqlStatement,
) -> Result<(ExecutionResult, SqlDiagnostics), QueryError> {
    let mut diagnostics_time = Duration::ZERO;

    let t = Instant::now();
    let examined_before = read_counter(session, ROWS_EXAMINED_COUNTER).await;
    let sent_before = read_counter(session, ROWS_SENT_COUNTER).await;
    diagnostics_time += t.elapsed();

    let exec_start = Instant::now();
    let rows = session
        .fetch_all(&stmt.text, &stmt.params)
        .await
        .inspect_err(|e| warn!("primary statement failed: {}", e))?;
    let execution_ms = elapsed_ms(exec_start);

    let t = Instant::now();
    let mut rows_examined = match examined_before {
        Some(before) => counter_delta(before, read_counter(session, ROWS_EXAMINED_COUNTER).await),
        None => None,
    };
    let rows_sent = match sent_before {
        Some(before) => counter_delta(before, read_counter(session, ROWS_SENT_COUNTER).await),
        None => None,
    };

    let (explain_type, explain) = explain_plan(session, stmt).await;

    // A zero delta is treated like a missing counter.
    if rows_examined.unwrap_or(0) == 0
        && explain_type == Some(ExplainType::Json)
        && let Some(plan) = explain.as_ref()
    {
        let estimate = estimate_rows_from_plan(plan);
        if estimate > 0 {
            debug!("rows_examined estimated from plan: {}", estimate);
            rows_examined = Some(estimate);
        }
    }
    diagnostics_time += t.elapsed();

    let bound = BoundSql::render(&stmt.text, &stmt.params);
    if !bound.is_fully_bound() {
        warn!(
            "statement has {} placeholders for {} parameters",
            bound.placeholders, bound.params
        );
    }
    if log_enabled!(Level::Debug) {
        debug!(
            "SQL executed in {} ms, {} rows:\n{}",
            execution_ms,
            rows.len(),
            bound.pretty()
        );
    }

    let diagnostics = SqlDiagnostics {
        rows_examined,
        rows_sent,
        explain_type,
        explain,
        execution_ms,
        diagnostics_ms: round_ms(diagnostics_time),
        total_ms: 0.0,
        query: bound.text,
    };
    Ok((ExecutionResult { rows, execution_ms }, diagnostics))
}

/// Read one session status counter. `None` means unsupported.
async fn read_counter(session: &mut dyn SqlSession, name: &str) -> Option<u64> {
    let sql = format!("SHOW SESSION STATUS LIKE '{}'", name);
    match session.fetch_all(&sql, &[]).await {
        Ok(rows) => {
            let value = rows.first().and_then(counter_value);
            if value.is_none() {
                debug!("session counter {} not reported", name);
            }
            value
        }
        Err(e) => {
            debug!("session counter {} unavailable: {}", name, e);
            None
        }
    }
}

fn counter_value(row: &RawRow) -> Option<u64> {
    match row.get("Value").or_else(|| row.get("VALUE"))? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Non-negative counter delta. A counter reset between reads clamps to zero.
pub fn counter_delta(before: u64, after: Option<u64>) -> Option<u64> {
    after.map(|after| after.saturating_sub(before))
}

/// Analyzed plan first, structured plan second, nothing if both fail.
async fn explain_plan(
    session: &mut dyn SqlSession,
    stmt: &SqlStatement,
) -> (Option<ExplainType>, Option<Value>) {
    let analyze = format!("EXPLAIN ANALYZE {}", stmt.text);
    match session.fetch_all(&analyze, &stmt.params).await {
        Ok(rows) => {
            let lines: Vec<String> = rows
                .iter()
                .filter_map(|r| r.values().next())
                .filter_map(|v| match v {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                })
                .collect();
            let text = (!lines.is_empty()).then(|| Value::String(lines.join("\n")));
            return (Some(ExplainType::Analyze), text);
        }
        Err(e) => debug!("EXPLAIN ANALYZE unavailable, trying FORMAT=JSON: {}", e),
    }

    let json = format!("EXPLAIN FORMAT=JSON {}", stmt.text);
    match session.fetch_all(&json, &stmt.params).await {
        Ok(rows) => {
            let plan = rows
                .first()
                .and_then(|r| r.values().next())
                .map(|v| match v {
                    Value::String(s) => {
                        serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone()))
                    }
                    other => other.clone(),
                });
            (Some(ExplainType::Json), plan)
        }
        Err(e) => {
            warn!("no query plan available: {}", e);
            (None, None)
        }
    }
}

/// Sum every numeric row-count field anywhere in a structured plan.
pub fn estimate_rows_from_plan(node: &Value) -> u64 {
    match node {
        Value::Object(map) => {
            let own: u64 = PLAN_ROW_KEYS
                .iter()
                .filter_map(|k| map.get(*k))
                .filter_map(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0) as u64)))
                .sum();
            own + map.values().map(estimate_rows_from_plan).sum::<u64>()
        }
        Value::Array(items) => items.iter().map(estimate_rows_from_plan).sum(),
        _ => 0,
    }
}
