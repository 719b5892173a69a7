pub mod enums;
pub mod structs;

pub use enums::{Backend, Cardinality, ExplainType, SqlParam};
pub use structs::{
    CanonicalRow, Diagnostics, ExecutionResult, MongoDiagnostics, Pagination, PayloadBody,
    QueryPayload, RawRow, SqlDiagnostics,
};
