pub mod stock_record_queries;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::{ConfigError, DatabaseConfig};

/// Builds a TLS-only pool. No connection is opened until the first query.
pub fn lazy_pool(config: &DatabaseConfig, max_connections: u32) -> Result<PgPool, ConfigError> {
    let options = config.connect_options()?;
    Ok(PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_lazy_with(options))
}
