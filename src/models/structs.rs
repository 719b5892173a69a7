use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::models::enums::{Backend, ExplainType};
use crate::query::errors::QueryError;

/// One engine-native result row, keyed by column or document field name.
pub type RawRow = Map<String, Value>;

/// Rows from a primary execute+fetch, timed around that call only.
#[derive(Clone, Debug, Default)]
pub struct ExecutionResult {
    pub rows: Vec<RawRow>,
    pub execution_ms: f64,
}

/// Best-effort relational diagnostics. Every `Option` is `None` when the
/// corresponding sub-step was unsupported or failed.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SqlDiagnostics {
    pub rows_examined: Option<u64>,
    pub rows_sent: Option<u64>,
    pub explain_type: Option<ExplainType>,
    pub explain: Option<Value>,
    pub execution_ms: f64,
    pub diagnostics_ms: f64,
    pub total_ms: f64,
    /// Display-only statement with literals in place of placeholders.
    pub query: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct MongoDiagnostics {
    /// Human-readable description of the operation that ran.
    pub query: Value,
    pub stats: Map<String, Value>,
    pub explain: Option<Value>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Diagnostics {
    Sql(SqlDiagnostics),
    Mongo(MongoDiagnostics),
}

impl Diagnostics {
    pub fn explain(&self) -> Option<&Value> {
        match self {
            Diagnostics::Sql(d) => d.explain.as_ref(),
            Diagnostics::Mongo(d) => d.explain.as_ref(),
        }
    }
}

/// Engine-agnostic, fixed-shape output row. Field order follows the shape
/// definition and is preserved on serialization.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CanonicalRow {
    fields: Vec<(&'static str, Value)>,
}

impl CanonicalRow {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            fields: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, name: &'static str, value: Value) {
        self.fields.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(k, _)| *k)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for CanonicalRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

impl Pagination {
    pub const DEFAULT_PAGE_SIZE: u64 = 20;
    pub const MAX_PAGE_SIZE: u64 = 100;

    /// Clamp raw request values to page >= 1 and page_size in 1..=100.
    /// A page whose first row lies past `i64::MAX` is rejected.
    pub fn clamped(page: Option<i64>, page_size: Option<i64>) -> Result<Self, QueryError> {
        let page = page.unwrap_or(1).max(1).unsigned_abs();
        let page_size = page_size
            .map_or(Self::DEFAULT_PAGE_SIZE, |n| n.max(1).unsigned_abs())
            .min(Self::MAX_PAGE_SIZE);
        let pagination = Self { page, page_size };
        pagination.checked_offset().ok_or_else(|| {
            QueryError::invalid_param(
                "page",
                format!("page {} of size {} is out of range", page, page_size),
            )
        })?;
        Ok(pagination)
    }

    fn checked_offset(&self) -> Option<i64> {
        let rows = self.page.checked_sub(1)?.checked_mul(self.page_size)?;
        i64::try_from(rows).ok()
    }

    /// Rows skipped before this page. Saturates for values that did not
    /// come through `clamped`.
    pub fn offset(&self) -> i64 {
        self.checked_offset().unwrap_or(i64::MAX)
    }

    pub fn limit(&self) -> i64 {
        i64::try_from(self.page_size).unwrap_or(i64::MAX)
    }
}

#[derive(Clone, Debug, Serialize)]
pub enum PayloadBody {
    #[serde(rename = "rows")]
    Rows(Vec<CanonicalRow>),
    #[serde(rename = "row")]
    Row(Option<CanonicalRow>),
}

/// Response contract shared by both engines.
#[derive(Clone, Debug, Serialize)]
pub struct QueryPayload {
    #[serde(flatten)]
    pub body: PayloadBody,
    pub ms: f64,
    pub perf: Diagnostics,
    pub source: Backend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl QueryPayload {
    pub fn rows(&self) -> &[CanonicalRow] {
        match &self.body {
            PayloadBody::Rows(rows) => rows,
            PayloadBody::Row(Some(row)) => std::slice::from_ref(row),
            PayloadBody::Row(None) => &[],
        }
    }
}
