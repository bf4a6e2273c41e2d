use alloy_primitives::{Address, U256 as AU256};
use revm::primitives::{BlockEnv, CfgEnv, SpecId, TransactTo, TxEnv, U256};
use validator_primitives::{ChainConfig, Header, TransactionSigned, TxKind};

/// Maps a chain config and a header's activation point to the revm hardfork
/// spec id the transaction pool of that block should be executed under.
pub fn spec_id(chain: &ChainConfig, header: &Header) -> SpecId {
    let hf = &chain.hardforks;
    if hf.is_cancun(header.timestamp) {
        SpecId::CANCUN
    } else if hf.is_shanghai(header.timestamp) {
        SpecId::SHANGHAI
    } else if hf.is_paris(header.number) {
        SpecId::MERGE
    } else if hf.is_london(header.number) {
        SpecId::LONDON
    } else if hf.is_byzantium(header.number) {
        SpecId::BYZANTIUM
    } else {
        SpecId::FRONTIER
    }
}

pub fn cfg_env(chain: &ChainConfig) -> CfgEnv {
    let mut cfg = CfgEnv::default();
    cfg.chain_id = chain.chain_id;
    cfg
}

pub fn block_env(header: &Header, author: Address) -> BlockEnv {
    BlockEnv {
        number: U256::from(header.number),
        coinbase: author,
        timestamp: U256::from(header.timestamp),
        gas_limit: U256::from(header.gas_limit),
        basefee: U256::from(header.base_fee_per_gas.unwrap_or_default()),
        difficulty: U256::from_be_bytes(header.difficulty.to_be_bytes::<32>()),
        prevrandao: header.base_fee_per_gas.map(|_| header.mix_hash),
        blob_excess_gas_and_price: header
            .excess_blob_gas
            .map(revm::primitives::BlobExcessGasAndPrice::new),
    }
}

pub fn tx_env(tx: &TransactionSigned, sender: Address) -> TxEnv {
    TxEnv {
        caller: sender,
        gas_limit: tx.gas_limit,
        gas_price: U256::from(tx.max_fee_per_gas.or(tx.gas_price).unwrap_or_default()),
        gas_priority_fee: tx.max_priority_fee_per_gas.map(U256::from),
        transact_to: match tx.to {
            TxKind::Call(addr) => TransactTo::Call(addr),
            TxKind::Create => TransactTo::Create,
        },
        value: u256_from_alloy(tx.value),
        data: tx.input.clone().0.into(),
        nonce: Some(tx.nonce),
        chain_id: tx.chain_id,
        access_list: tx
            .access_list
            .0
            .iter()
            .map(|item| (item.address, item.storage_keys.iter().map(|k| u256_from_alloy(AU256::from_be_bytes(k.0))).collect()))
            .collect(),
        blob_hashes: tx.blob_versioned_hashes.iter().map(|h| revm::primitives::B256::from_slice(h.as_slice())).collect(),
        max_fee_per_blob_gas: tx.max_fee_per_blob_gas.map(U256::from),
        ..Default::default()
    }
}

fn u256_from_alloy(v: AU256) -> U256 {
    U256::from_be_bytes(v.to_be_bytes::<32>())
}
