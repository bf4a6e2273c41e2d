use alloy_primitives::{Address, BlockNumber, Bloom, Bytes, B256, B64, U256};

/// A canonical block header as reconstructed from the index.
///
/// Mirrors the columns the indexer writes into `eth.header_cids`, with the
/// IPLD-decoded header fields needed by re-execution and the referential
/// integrity auditor. Fields the validator never inspects (e.g. the raw RLP)
/// are intentionally omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub number: BlockNumber,
    pub hash: B256,
    pub parent_hash: B256,
    pub uncle_hash: B256,
    pub state_root: B256,
    pub transactions_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bloom,
    pub beneficiary: Address,
    pub difficulty: U256,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Bytes,
    pub mix_hash: B256,
    pub nonce: B64,
    pub base_fee_per_gas: Option<u64>,
    pub withdrawals_root: Option<B256>,
    pub blob_gas_used: Option<u64>,
    pub excess_blob_gas: Option<u64>,
    pub parent_beacon_block_root: Option<B256>,
}

impl Header {
    /// Whether this header carries an EIP-2930+ access list-capable base fee field.
    pub fn is_post_london(&self) -> bool {
        self.base_fee_per_gas.is_some()
    }
}

/// An uncle (ommer) header, as referenced by a block's uncle records.
pub type UncleHeader = Header;
