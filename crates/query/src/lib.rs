//! Read-only access to the Postgres-backed chain index: block assembly for
//! re-execution and the anti-join probes the referential integrity auditor
//! runs.

pub mod block;
pub mod integrity;
pub mod pool;

pub use block::{fetch_author, fetch_block, fetch_receipts, latest_height};
pub use pool::{DbParams, DbPool};
