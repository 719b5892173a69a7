//! Routes a logical query to the engine the caller selected and assembles
//! the shared response contract. There is no failover between engines.

use std::sync::Arc;

use log::info;
use serde_json::Value;

use super::errors::QueryError;
use super::executor::{DocumentStore, SqlConnector};
use super::logical::LogicalQuery;
use super::{mongo_diagnostics, sql_diagnostics};
use crate::catalog::{self, RequestParams};
use crate::models::enums::{Backend, Cardinality};
use crate::models::structs::{Diagnostics, PayloadBody, QueryPayload, RawRow};

/// Entry point used by request handlers. Holds both backends for the
/// lifetime of the process.
#[derive(Clone)]
pub struct QueryService {
    sql: Arc<dyn SqlConnector>,
    documents: Arc<dyn DocumentStore>,
}

impl QueryService {
    pub fn new(sql: Arc<dyn SqlConnector>, documents: Arc<dyn DocumentStore>) -> Self {
        Self { sql, documents }
    }

    /// Resolve `name` in the catalog, bind `params` and run it on `backend`.
    /// `verbose` requests document-store explain output.
    pub async fn run(
        &self,
        name: &str,
        backend: Backend,
        params: &RequestParams,
        verbose: bool,
    ) -> Result<QueryPayload, QueryError> {
        let query = catalog::build(name, params)?;
        self.execute(&query, backend, verbose).await
    }

    pub async fn execute(
        &self,
        query: &LogicalQuery,
        backend: Backend,
        verbose: bool,
    ) -> Result<QueryPayload, QueryError> {
        let (rows, ms, perf, total) = match backend {
            Backend::Sql => {
                let (result, diagnostics) =
                    sql_diagnostics::run_with_diagnostics(self.sql.as_ref(), &query.sql).await?;
                let total = match &query.count {
                    Some(count) => {
                        let counted = sql_diagnostics::run_plain(self.sql.as_ref(), &count.sql).await?;
                        Some(total_from_rows(&counted.rows))
                    }
                    None => None,
                };
                (
                    result.rows,
                    result.execution_ms,
                    Diagnostics::Sql(diagnostics),
                    total,
                )
            }
            Backend::Mongo => {
                let (output, ms, diagnostics) = mongo_diagnostics::run_with_diagnostics(
                    self.documents.as_ref(),
                    &query.document,
                    verbose,
                )
                .await?;
                let total = match &query.count {
                    Some(count) => Some(self.documents.execute(&count.document).await?.count()),
                    None => None,
                };
                (output.into_rows(), ms, Diagnostics::Mongo(diagnostics), total)
            }
        };

        info!(
            "{} answered {} in {} ms ({} rows)",
            backend,
            query.name,
            ms,
            rows.len()
        );

        let canonical = query.shape.normalize(&rows);
        let body = match query.cardinality {
            Cardinality::Single => PayloadBody::Row(canonical.into_iter().next()),
            Cardinality::Many | Cardinality::Paged => PayloadBody::Rows(canonical),
        };
        let pagination = query
            .pagination
            .filter(|_| query.cardinality == Cardinality::Paged);

        Ok(QueryPayload {
            body,
            ms,
            perf,
            source: backend,
            page: pagination.map(|p| p.page),
            page_size: pagination.map(|p| p.page_size),
            total: total.or_else(|| pagination.map(|_| 0)),
        })
    }
}

/// `total` column of a `COUNT(*) AS total` result; zero when absent.
fn total_from_rows(rows: &[RawRow]) -> u64 {
    rows.first()
        .and_then(|r| r.get("total"))
        .and_then(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
        .unwrap_or(0)
}
