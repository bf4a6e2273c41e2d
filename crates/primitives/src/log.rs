use alloy_primitives::{Address, Bytes, B256};

/// A single EVM log entry, as emitted by the `LOG0`..`LOG4` opcodes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}
