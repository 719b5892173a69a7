//! Document-store execution with opt-in explain diagnostics.

use std::time::Instant;

use futures_util::future::join;
use log::{debug, warn};
use mongodb::bson::{Bson, Document};
use serde_json::{Map, Value, json};

use super::elapsed_ms;
use super::errors::QueryError;
use super::executor::{DocumentOutput, DocumentStore};
use super::logical::DocumentOperation;
use crate::models::structs::MongoDiagnostics;

/// Scalar totals collected from an executionStats explain tree.
pub const EXPLAIN_COUNTERS: [&str; 4] = [
    "totalDocsExamined",
    "totalKeysExamined",
    "nReturned",
    "executionTimeMillis",
];

/// Run `op`, timing only the operation. With `verbose`, an explain for the
/// same operation runs alongside it; explain failures leave `explain` empty.
pub async fn run_with_diagnostics(
    store: &dyn DocumentStore,
    op: &DocumentOperation,
    verbose: bool,
) -> Result<(DocumentOutput, f64, MongoDiagnostics), QueryError> {
    let primary = async {
        let start = Instant::now();
        let output = store.execute(op).await;
        (output, elapsed_ms(start))
    };
    let ((output, execution_ms), explained) = if verbose {
        let (primary, explained) = join(primary, store.explain(op)).await;
        (primary, Some(explained))
    } else {
        (primary.await, None)
    };
    let output =
        output.inspect_err(|e| warn!("document operation on {} failed: {}", op.collection(), e))?;

    let mut stats = Map::new();
    stats.insert("docs_returned".into(), json!(output.count()));

    let mut explain = None;
    match explained {
        Some(Ok(doc)) => {
            let tree = explain_to_json(doc);
            stats.extend(extract_counters(&tree));
            explain = Some(tree);
        }
        Some(Err(e)) => debug!("explain for {} unavailable: {}", op.collection(), e),
        None => {}
    }

    let diagnostics = MongoDiagnostics {
        query: op.describe(),
        stats,
        explain,
    };
    Ok((output, execution_ms, diagnostics))
}

pub fn explain_to_json(doc: Document) -> Value {
    Bson::Document(doc).into_relaxed_extjson()
}

/// Depth-first walk over every (key, value) pair of a JSON tree. A map's own
/// entries are visited before descending into its children.
pub fn walk_tree<'a, F>(node: &'a Value, visit: &mut F)
where
    F: FnMut(&'a str, &'a Value),
{
    match node {
        Value::Object(map) => {
            for (k, v) in map {
                visit(k, v);
            }
            for v in map.values() {
                walk_tree(v, visit);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_tree(item, visit);
            }
        }
        _ => {}
    }
}

/// First numeric occurrence of each counter in `EXPLAIN_COUNTERS`, at any depth.
pub fn extract_counters(tree: &Value) -> Map<String, Value> {
    let mut found = Map::new();
    walk_tree(tree, &mut |key, value| {
        if value.is_number() && EXPLAIN_COUNTERS.contains(&key) && !found.contains_key(key) {
            found.insert(key.to_string(), value.clone());
        }
    });
    found
}
