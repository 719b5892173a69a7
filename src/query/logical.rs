//! Logical query representations: one per engine, plus the catalog entry
//! that pairs them with a canonical output shape.

use mongodb::bson::{Bson, Document, doc};
use serde_json::{Value, json};

use crate::models::enums::{Cardinality, SqlParam};
use crate::models::structs::Pagination;
use crate::query::normalize::CanonicalShape;

/// Parameterized statement with `?` placeholders and positional values.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub text: String,
    pub params: Vec<SqlParam>,
}

impl SqlStatement {
    pub fn new(text: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            text: text.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FindSpec {
    pub collection: String,
    pub filter: Document,
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

impl FindSpec {
    pub fn new(collection: impl Into<String>, filter: Document) -> Self {
        Self {
            collection: collection.into(),
            filter,
            ..Default::default()
        }
    }

    pub fn projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Document-store operation descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOperation {
    Find(FindSpec),
    Aggregate {
        collection: String,
        pipeline: Vec<Document>,
    },
    Count {
        collection: String,
        filter: Document,
    },
}

impl DocumentOperation {
    pub fn collection(&self) -> &str {
        match self {
            DocumentOperation::Find(spec) => &spec.collection,
            DocumentOperation::Aggregate { collection, .. } => collection,
            DocumentOperation::Count { collection, .. } => collection,
        }
    }

    /// `explain` command at executionStats verbosity for the same operation.
    pub fn explain_command(&self) -> Document {
        let inner = match self {
            DocumentOperation::Find(spec) => {
                let mut cmd = doc! { "find": spec.collection.as_str(), "filter": spec.filter.clone() };
                if let Some(p) = &spec.projection {
                    cmd.insert("projection", p.clone());
                }
                if let Some(s) = &spec.sort {
                    cmd.insert("sort", s.clone());
                }
                if let Some(skip) = spec.skip {
                    cmd.insert("skip", i64::try_from(skip).unwrap_or(i64::MAX));
                }
                if let Some(limit) = spec.limit {
                    cmd.insert("limit", limit);
                }
                cmd
            }
            DocumentOperation::Aggregate {
                collection,
                pipeline,
            } => doc! {
                "aggregate": collection.as_str(),
                "pipeline": pipeline.clone(),
                "cursor": {},
            },
            DocumentOperation::Count { collection, filter } => doc! {
                "count": collection.as_str(),
                "query": filter.clone(),
            },
        };
        doc! { "explain": inner, "verbosity": "executionStats" }
    }

    /// JSON rendering for the `query` field of document diagnostics.
    pub fn describe(&self) -> Value {
        fn ext(d: &Document) -> Value {
            Bson::Document(d.clone()).into_relaxed_extjson()
        }
        match self {
            DocumentOperation::Find(spec) => {
                let mut out = serde_json::Map::new();
                out.insert(format!("{}.find", spec.collection), ext(&spec.filter));
                if let Some(p) = &spec.projection {
                    out.insert("projection".into(), ext(p));
                }
                if let Some(s) = &spec.sort {
                    out.insert("sort".into(), ext(s));
                }
                if let Some(skip) = spec.skip {
                    out.insert("skip".into(), json!(skip));
                }
                if let Some(limit) = spec.limit {
                    out.insert("limit".into(), json!(limit));
                }
                Value::Object(out)
            }
            DocumentOperation::Aggregate {
                collection,
                pipeline,
            } => {
                let stages: Vec<Value> = pipeline.iter().map(ext).collect();
                json!({ (format!("{}.aggregate", collection)): stages })
            }
            DocumentOperation::Count { collection, filter } => {
                json!({ (format!("{}.count_documents", collection)): ext(filter) })
            }
        }
    }
}

/// Page-total companion queries, run outside the timed primary path.
#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    pub sql: SqlStatement,
    pub document: DocumentOperation,
}

/// A catalog query bound to concrete parameters, ready for either engine.
#[derive(Debug, Clone)]
pub struct LogicalQuery {
    pub name: &'static str,
    pub sql: SqlStatement,
    pub document: DocumentOperation,
    pub shape: &'static CanonicalShape,
    pub cardinality: Cardinality,
    pub pagination: Option<Pagination>,
    pub count: Option<CountQuery>,
}
