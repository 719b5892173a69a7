pub mod mongodb;
pub mod mysql;

pub use self::mongodb::MongoDbExecutor;
pub use self::mysql::{MySqlExecutor, MySqlSession};
