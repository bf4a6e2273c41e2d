//! Re-executes a block's transactions through `revm` against indexed state,
//! applies block reward and withdrawal accrual, and checks the result
//! against the header's declared state root.

pub mod env;
pub mod processor;
pub mod state_root;

pub use processor::BlockProcessor;
