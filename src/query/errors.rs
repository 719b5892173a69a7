use crate::models::enums::Backend;

/// Failures that reach the caller. Diagnostics problems never become one of
/// these; they degrade to absent fields instead.
#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error("{backend} backend unreachable: {reason}")]
    Connect { backend: Backend, reason: String },
    #[error("query failed: {reason} (query: {query})")]
    Execution { query: String, reason: String },
    #[error("unknown logical query: {0}")]
    UnknownQuery(String),
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParam { name: String, reason: String },
    #[error("configuration error: {0}")]
    Config(String),
}

impl QueryError {
    pub fn invalid_param(name: &str, reason: impl Into<String>) -> Self {
        QueryError::InvalidParam {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
