/// PostgreSQL plumbing
///
/// - `pool`: connection pool with health check and graceful close
/// - `migrations`: embedded schema migrations
///
/// Row-level operations live on the models; [`crate::store::PgStore`] ties
/// both together.

pub mod migrations;
pub mod pool;
