/// Database layer
///
/// - `pool`: PostgreSQL connection pool management
/// - `migrations`: Migration runner utilities

pub mod migrations;
pub mod pool;

pub use migrations::run_migrations;
pub use pool::{create_pool, health_check, DatabaseConfig};
