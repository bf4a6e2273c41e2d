//! Domain types shared by every crate that re-executes or audits indexed
//! chain data: headers, blocks, transactions, receipts, logs, chain
//! configuration and the block-reward schedule.

pub mod block;
pub mod chain;
pub mod header;
pub mod log;
pub mod receipt;
pub mod reward;
pub mod transaction;

pub use block::{Block, BlockBody, Withdrawal};
pub use chain::{ChainConfig, Engine, Hardforks};
pub use header::{Header, UncleHeader};
pub use log::Log;
pub use receipt::Receipt;
pub use transaction::{AccessList, AccessListItem, TransactionSigned, TxKind, TxSignature, TxType};
