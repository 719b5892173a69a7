//! Football statistics served from either a MySQL schema or a MongoDB read
//! model, with per-engine performance diagnostics attached to every answer.

use std::sync::Arc;

pub mod catalog;
pub mod config;
pub mod models;
pub mod query;

pub use catalog::RequestParams;
pub use config::AppConfig;
pub use models::enums::Backend;
pub use models::structs::QueryPayload;
pub use query::{QueryError, QueryService};

use query::executors::{MongoDbExecutor, MySqlExecutor};

/// Install the `env_logger` backend. `RUST_LOG` overrides the default
/// level; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_module("pitchstats", log::LevelFilter::Info)
        .parse_default_env()
        .is_test(false)
        .try_init();
}

/// Build a `QueryService` over the configured MySQL server and MongoDB
/// deployment. MySQL connections are opened per query; the Mongo client is
/// shared.
pub async fn connect_service(config: &AppConfig) -> Result<QueryService, QueryError> {
    let sql = MySqlExecutor::new(&config.mysql)?;
    let documents = MongoDbExecutor::connect(&config.mongo).await?;
    log::info!(
        "Query service ready (mysql {}:{}, mongo database {})",
        config.mysql.host,
        config.mysql.port,
        config.mongo.database
    );
    Ok(QueryService::new(Arc::new(sql), Arc::new(documents)))
}
