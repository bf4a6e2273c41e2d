//! The read-only state backend re-execution runs against: a [`revm::Database`]
//! pinned to one block height, plus the block/author lookups the
//! progression loop needs to decide what to do next.

pub mod account;
pub mod backend;
pub mod db;

pub use account::{fetch_full_state, AccountState};
pub use backend::StateBackend;
pub use db::IndexStateDb;
