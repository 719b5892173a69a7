//! Backend seams for the two engines.
//!
//! The relational side is connection-scoped: a `SqlConnector` opens one
//! `SqlSession` per logical query and the session is closed when the query
//! finishes. The document side is a single long-lived `DocumentStore` handle
//! shared across requests.

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use serde_json::Value;

use super::errors::QueryError;
use super::logical::DocumentOperation;
use crate::models::enums::SqlParam;
use crate::models::structs::RawRow;

/// One open relational connection.
#[async_trait]
pub trait SqlSession: Send {
    /// Execute a statement with positional parameters bound by the driver
    /// and fetch every row.
    async fn fetch_all(&mut self, sql: &str, params: &[SqlParam])
    -> Result<Vec<RawRow>, QueryError>;

    /// Release the connection. Dropping a session also releases it.
    async fn close(&mut self) {}
}

/// Opens relational sessions.
#[async_trait]
pub trait SqlConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn SqlSession>, QueryError>;
}

/// Result of a document-store operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOutput {
    Documents(Vec<Document>),
    Count(u64),
}

impl DocumentOutput {
    pub fn into_documents(self) -> Vec<Document> {
        match self {
            DocumentOutput::Documents(docs) => docs,
            DocumentOutput::Count(_) => Vec::new(),
        }
    }

    /// Documents as JSON rows via relaxed extended JSON.
    pub fn into_rows(self) -> Vec<RawRow> {
        self.into_documents()
            .into_iter()
            .filter_map(|d| match Bson::Document(d).into_relaxed_extjson() {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self) -> u64 {
        match self {
            DocumentOutput::Documents(docs) => docs.len() as u64,
            DocumentOutput::Count(n) => *n,
        }
    }
}

/// Shared handle to the document store. Implementations must be safe for
/// concurrent use.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn execute(&self, op: &DocumentOperation) -> Result<DocumentOutput, QueryError>;

    /// Run the executionStats explain for `op` and return the raw explain document.
    async fn explain(&self, op: &DocumentOperation) -> Result<Document, QueryError>;
}
