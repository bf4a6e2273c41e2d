use alloy_primitives::Bloom;

use crate::{log::Log, transaction::TxType};

/// A transaction receipt, as reconstructed from the index's receipt records.
///
/// `bloom` is recomputed from `logs` during re-execution rather than trusted
/// from the index, since a mismatching bloom is itself evidence the logs
/// column is wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_type: TxType,
    pub success: bool,
    pub cumulative_gas_used: u64,
    pub logs: Vec<Log>,
    pub bloom: Bloom,
}
