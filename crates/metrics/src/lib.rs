//! Prometheus metrics the progression loop publishes: the last block that
//! cleared both re-execution and referential integrity, and the health of
//! the database connection pool.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;
use validator_query::DbPool;

pub const LAST_VALIDATED_BLOCK: &str = "statediff_validator_last_validated_block";
pub const DB_POOL_CONNECTIONS: &str = "statediff_validator_db_pool_connections";
pub const DB_POOL_IDLE_CONNECTIONS: &str = "statediff_validator_db_pool_idle_connections";
pub const BLOCKS_BACKFILLED_TOTAL: &str = "statediff_validator_blocks_backfilled_total";
pub const INTEGRITY_GAPS_TOTAL: &str = "statediff_validator_integrity_gaps_total";

/// Installs the process-wide Prometheus recorder and serves `/metrics` on
/// `addr`. Returns the handle so tests can scrape text output directly
/// without binding a socket.
pub fn install(addr: SocketAddr) -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    let handle = PrometheusBuilder::new().with_http_listener(addr).install_recorder()?;
    info!(%addr, "metrics exporter listening");
    Ok(handle)
}

pub fn record_last_validated_block(block_number: u64) {
    metrics::gauge!(LAST_VALIDATED_BLOCK).set(block_number as f64);
}

pub fn record_backfill_requested() {
    metrics::counter!(BLOCKS_BACKFILLED_TOTAL).increment(1);
}

pub fn record_integrity_gap() {
    metrics::counter!(INTEGRITY_GAPS_TOTAL).increment(1);
}

/// Samples the database pool's current size and idle-connection count into
/// the gauges above. Call periodically from the progression loop; sqlx
/// doesn't push pool events, so this is a point-in-time poll rather than a
/// live subscription.
pub fn record_pool_stats(pool: &DbPool) {
    let inner = pool.inner();
    metrics::gauge!(DB_POOL_CONNECTIONS).set(inner.size() as f64);
    metrics::gauge!(DB_POOL_IDLE_CONNECTIONS).set(inner.num_idle() as f64);
}
