//! Dual-engine query layer.
//!
//! A logical query runs on exactly one engine, chosen by the caller. The
//! engine's diagnostics extractor times the primary call and gathers
//! best-effort diagnostics, the normalizer reshapes rows into the canonical
//! contract, and dispatch assembles the tagged payload.

use std::time::{Duration, Instant};

pub mod bound_sql;
pub mod dispatch;
pub mod errors;
pub mod executor;
pub mod executors;
pub mod logical;
pub mod mongo_diagnostics;
pub mod normalize;
pub mod sql_diagnostics;

pub use bound_sql::BoundSql;
pub use dispatch::QueryService;
pub use errors::QueryError;
pub use executor::{DocumentOutput, DocumentStore, SqlConnector, SqlSession};
pub use logical::{CountQuery, DocumentOperation, FindSpec, LogicalQuery, SqlStatement};
pub use normalize::{CanonicalShape, FieldSpec};

/// Milliseconds rounded to two decimals.
pub(crate) fn round_ms(d: Duration) -> f64 {
    (d.as_secs_f64() * 100_000.0).round() / 100.0
}

pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    round_ms(start.elapsed())
}
