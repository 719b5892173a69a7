use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which engine answers a logical query. Always chosen by the caller.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sql,
    Mongo,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Sql => "sql",
            Backend::Mongo => "mongo",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sql" | "mysql" => Ok(Backend::Sql),
            "mongo" | "mongodb" => Ok(Backend::Mongo),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// A positional statement parameter. Bound through the driver, never spliced
/// into executable text.
#[derive(Clone, PartialEq, Debug)]
pub enum SqlParam {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Int(v)
    }
}

impl From<f64> for SqlParam {
    fn from(v: f64) -> Self {
        SqlParam::Float(v)
    }
}

impl From<bool> for SqlParam {
    fn from(v: bool) -> Self {
        SqlParam::Bool(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(v.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(v)
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlParam::Null)
    }
}

/// Format of the plan stored in `SqlDiagnostics::explain`.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
pub enum ExplainType {
    /// `EXPLAIN ANALYZE` tree text
    Analyze,
    /// `EXPLAIN FORMAT=JSON` structured plan
    Json,
}

/// How many rows a logical query yields, and therefore the payload shape.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cardinality {
    Single,
    Many,
    Paged,
}
