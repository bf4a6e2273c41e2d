use std::time::Duration;

use sqlx::postgres::{PgPoolOptions, PgSslMode};
use validator_errors::DbError;

/// Connection parameters for the indexed database. Mirrors the knobs a
/// Postgres-backed IPLD indexer is normally deployed with: a bounded pool
/// with an idle/open ceiling and a max connection lifetime to play nicely
/// with infrastructure that recycles connections out from under a long-lived
/// pool.
#[derive(Debug, Clone)]
pub struct DbParams {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub max_idle: u32,
    pub max_open: u32,
    pub max_lifetime: Duration,
}

impl Default for DbParams {
    fn default() -> Self {
        DbParams {
            host: "localhost".to_string(),
            port: 5432,
            database: "vulcanize_public".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            max_idle: 4,
            max_open: 8,
            max_lifetime: Duration::from_secs(0),
        }
    }
}

/// A pool of connections to the indexed database, opened read-only: the
/// validator only ever reads rows the indexer already wrote.
#[derive(Debug, Clone)]
pub struct DbPool {
    pub(crate) pool: sqlx::PgPool,
}

impl DbPool {
    pub async fn connect(params: &DbParams) -> Result<Self, DbError> {
        let options = sqlx::postgres::PgConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .database(&params.database)
            .username(&params.user)
            .password(&params.password)
            .ssl_mode(PgSslMode::Prefer);

        let mut opts = PgPoolOptions::new().min_connections(params.max_idle).max_connections(params.max_open);
        if !params.max_lifetime.is_zero() {
            opts = opts.max_lifetime(Some(params.max_lifetime));
        }

        let pool = opts.connect_with(options).await?;
        Ok(DbPool { pool })
    }

    pub fn inner(&self) -> &sqlx::PgPool {
        &self.pool
    }

    /// Wraps an already-open pool, for callers (integration tests, mostly)
    /// that connect via a plain URL rather than [`DbParams`].
    pub fn from_pool(pool: sqlx::PgPool) -> Self {
        DbPool { pool }
    }
}
