//! MongoDB executor
//!
//! Wraps one long-lived `mongodb::Database` handle. The driver client is
//! internally pooled and safe to share across requests.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use log::debug;
use mongodb::Client;
use mongodb::bson::Document;

use crate::config::MongoSettings;
use crate::models::enums::Backend;
use crate::query::errors::QueryError;
use crate::query::executor::{DocumentOutput, DocumentStore};
use crate::query::logical::DocumentOperation;

pub struct MongoDbExecutor {
    database: mongodb::Database,
    max_time: Option<Duration>,
}

impl MongoDbExecutor {
    /// Build the shared client once at process start.
    pub async fn connect(settings: &MongoSettings) -> Result<Self, QueryError> {
        let client = Client::with_uri_str(&settings.uri)
            .await
            .map_err(|e| QueryError::Connect {
                backend: Backend::Mongo,
                reason: e.to_string(),
            })?;
        Ok(Self::from_client(&client, settings))
    }

    pub fn from_client(client: &Client, settings: &MongoSettings) -> Self {
        debug!("MongoDbExecutor: using database {}", settings.database);
        Self {
            database: client.database(&settings.database),
            max_time: settings.max_time_ms.map(Duration::from_millis),
        }
    }

    fn execution_error(op: &DocumentOperation, e: mongodb::error::Error) -> QueryError {
        QueryError::Execution {
            query: op.describe().to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl DocumentStore for MongoDbExecutor {
    async fn execute(&self, op: &DocumentOperation) -> Result<DocumentOutput, QueryError> {
        debug!("MongoDbExecutor: executing on {}", op.collection());
        let collection = self.database.collection::<Document>(op.collection());

        let output = match op {
            DocumentOperation::Find(spec) => {
                let mut find = collection.find(spec.filter.clone());
                if let Some(p) = &spec.projection {
                    find = find.projection(p.clone());
                }
                if let Some(s) = &spec.sort {
                    find = find.sort(s.clone());
                }
                if let Some(skip) = spec.skip {
                    find = find.skip(skip);
                }
                if let Some(limit) = spec.limit {
                    find = find.limit(limit);
                }
                let cursor = find.await.map_err(|e| Self::execution_error(op, e))?;
                let docs: Vec<Document> = cursor
                    .try_collect()
                    .await
                    .map_err(|e| Self::execution_error(op, e))?;
                DocumentOutput::Documents(docs)
            }
            DocumentOperation::Aggregate { pipeline, .. } => {
                let mut aggregate = collection.aggregate(pipeline.clone());
                if let Some(max_time) = self.max_time {
                    aggregate = aggregate.max_time(max_time);
                }
                let cursor = aggregate.await.map_err(|e| Self::execution_error(op, e))?;
                let docs: Vec<Document> = cursor
                    .try_collect()
                    .await
                    .map_err(|e| Self::execution_error(op, e))?;
                DocumentOutput::Documents(docs)
            }
            DocumentOperation::Count { filter, .. } => {
                let n = collection
                    .count_documents(filter.clone())
                    .await
                    .map_err(|e| Self::execution_error(op, e))?;
                DocumentOutput::Count(n)
            }
        };

        debug!(
            "MongoDbExecutor: {} returned {} documents",
            op.collection(),
            output.count()
        );
        Ok(output)
    }

    async fn explain(&self, op: &DocumentOperation) -> Result<Document, QueryError> {
        self.database
            .run_command(op.explain_command())
            .await
            .map_err(|e| Self::execution_error(op, e))
    }
}
