//! Error types shared by every layer of the statediff validator.
//!
//! Each component gets its own error enum so callers can match on failure
//! kind instead of string-sniffing; [`ValidatorError`] is the fatal error
//! the service loop ultimately reports.

use alloy_primitives::{BlockNumber, TxHash, B256};
use thiserror::Error;

/// Errors raised while resolving configuration (CLI/env/file/default layering,
/// chain-config loading).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("from-block must be >= 1, got {0}")]
    FromBlockZero(u64),
    #[error("failed to read chain config file {path}: {source}")]
    ChainConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse chain config file {path}: {source}")]
    ChainConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown chain id {0} and no chain-config file provided")]
    UnknownChainId(u64),
    #[error("failed to load config file {path}: {source}")]
    FileLoad {
        path: String,
        #[source]
        source: confy::ConfyError,
    },
}

/// Errors raised by the query library and the database pool.
#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("header not indexed at block {0}")]
    HeaderNotIndexed(BlockNumber),
    #[error("state leaf {state_path:?} not indexed at block {block_number}")]
    StateNotIndexed { state_path: Vec<u8>, block_number: BlockNumber },
    #[error("ipld block missing for key {key:?} at block {block_number}")]
    IpldBlockMissing { key: Vec<u8>, block_number: BlockNumber },
}

/// Errors raised while re-executing a block's transactions (§4.4).
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("no transactions in genesis")]
    GenesisReexecution,
    #[error("parent {0:#x} not found")]
    ParentNotFound(B256),
    #[error("failed to recover transaction sender for tx {0:#x}")]
    SenderRecovery(TxHash),
    #[error("transaction {hash:#x} failed: {message}")]
    Evm { hash: TxHash, message: String },
    #[error("transaction {transaction_gas_limit} exceeds available block gas {block_available_gas} at block {block_number}")]
    GasLimitExceeded { block_number: BlockNumber, transaction_gas_limit: u64, block_available_gas: u64 },
    #[error("state roots do not match at block {block_number}: expected {expected:#x}, got {got:#x}")]
    StateRootMismatch { block_number: BlockNumber, expected: B256, got: B256 },
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Errors raised by the referential-integrity auditor (§4.5).
#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("referential integrity gap at block {block_number}: {child} has no matching row in {parent}")]
    Gap { block_number: BlockNumber, child: &'static str, parent: &'static str },
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Errors raised while prompting the upstream node to back-fill a missing block.
#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("back-fill rpc call failed: {0}")]
    Rpc(String),
    #[error("back-fill rpc call timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// The top-level fatal error the progression loop reports on exit.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    #[error("block {0} is not canonical in the index")]
    BlockNotFound(BlockNumber),
}

impl ValidatorError {
    /// The block number this error was raised for, when known.
    ///
    /// Used by callers that need to log "fatal at block N" regardless of
    /// which layer raised the error.
    pub fn block_number(&self) -> Option<BlockNumber> {
        match self {
            ValidatorError::Execution(ExecutionError::StateRootMismatch { block_number, .. })
            | ValidatorError::Execution(ExecutionError::GasLimitExceeded { block_number, .. })
            | ValidatorError::Integrity(IntegrityError::Gap { block_number, .. })
            | ValidatorError::Db(DbError::HeaderNotIndexed(block_number))
            | ValidatorError::Db(DbError::StateNotIndexed { block_number, .. })
            | ValidatorError::Db(DbError::IpldBlockMissing { block_number, .. })
            | ValidatorError::BlockNotFound(block_number) => Some(*block_number),
            _ => None,
        }
    }
}
