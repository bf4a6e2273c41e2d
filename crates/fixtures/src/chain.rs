//! Builds the ten-block scenario used across the integration suite: a bank
//! account funding two others and deploying a tiny storage contract, then a
//! run of plain blocks padding the chain out for trail testing.
//!
//! Bytecode for the contract is deliberately minimal: its runtime is
//! `PUSH1 0 CALLDATALOAD PUSH1 0 SSTORE STOP`, i.e. "store the first word of
//! calldata at slot 0" — just enough to give `Put(v)` a real state effect to
//! re-execute and verify a root over.

use std::collections::BTreeMap;

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use secp256k1::{Message, SecretKey, SECP256K1};
use validator_executor::state_root::compute_state_root;
use validator_primitives::{
    AccessList, Block, BlockBody, ChainConfig, Header, TransactionSigned, TxKind, TxSignature, TxType,
};
use validator_state::AccountState;

const CHAIN_ID: u64 = 1337;
const RUNTIME_CODE: [u8; 7] = [0x60, 0x00, 0x35, 0x60, 0x00, 0x55, 0x00];

/// A deployer account and two recipients, each with a fixed secret key so
/// signatures (and therefore tx hashes) are reproducible across runs.
pub struct Accounts {
    pub bank_key: SecretKey,
    pub account1_key: SecretKey,
    pub bank: Address,
    pub account1: Address,
    pub account2: Address,
}

fn address_of(key: &SecretKey) -> Address {
    let public = key.public_key(SECP256K1);
    let uncompressed = public.serialize_uncompressed();
    Address::from_slice(&keccak256(&uncompressed[1..])[12..])
}

impl Default for Accounts {
    fn default() -> Self {
        let bank_key = SecretKey::from_slice(&[0x11; 32]).unwrap();
        let account1_key = SecretKey::from_slice(&[0x22; 32]).unwrap();
        let account2 = address_of(&SecretKey::from_slice(&[0x33; 32]).unwrap());
        Accounts { bank: address_of(&bank_key), account1: address_of(&account1_key), account2, bank_key, account1_key }
    }
}

fn sign(key: &SecretKey, mut tx: TransactionSigned) -> TransactionSigned {
    let sig_hash = tx.signature_hash();
    let message = Message::from_digest_slice(sig_hash.as_slice()).unwrap();
    let (recovery_id, compact) = SECP256K1.sign_ecdsa_recoverable(&message, key).serialize_compact();
    tx.signature = TxSignature {
        r: U256::from_be_slice(&compact[..32]),
        s: U256::from_be_slice(&compact[32..]),
        odd_y_parity: recovery_id.to_i32() == 1,
    };
    tx.hash = sig_hash;
    tx
}

fn transfer(index: u64, nonce: u64, from_key: &SecretKey, to: Address, value_wei: u64) -> TransactionSigned {
    let unsigned = TransactionSigned {
        hash: B256::ZERO,
        index,
        tx_type: TxType::Legacy,
        chain_id: Some(CHAIN_ID),
        nonce,
        gas_limit: 21_000,
        to: TxKind::Call(to),
        value: U256::from(value_wei),
        input: Bytes::new(),
        access_list: AccessList::default(),
        gas_price: Some(1_000_000_000),
        max_fee_per_gas: None,
        max_priority_fee_per_gas: None,
        max_fee_per_blob_gas: None,
        blob_versioned_hashes: Vec::new(),
        signature: TxSignature { r: U256::ZERO, s: U256::ZERO, odd_y_parity: false },
    };
    sign(from_key, unsigned)
}

fn deploy_contract(index: u64, nonce: u64, from_key: &SecretKey) -> TransactionSigned {
    let mut init_code = vec![
        0x60, RUNTIME_CODE.len() as u8, // PUSH1 <len>
        0x80, // DUP1
        0x60, 0x0b, // PUSH1 <offset of runtime code below>
        0x60, 0x00, // PUSH1 0
        0x39, // CODECOPY
        0x60, 0x00, // PUSH1 0
        0xf3, // RETURN
    ];
    init_code.extend_from_slice(&RUNTIME_CODE);

    let unsigned = TransactionSigned {
        hash: B256::ZERO,
        index,
        tx_type: TxType::Legacy,
        chain_id: Some(CHAIN_ID),
        nonce,
        gas_limit: 200_000,
        to: TxKind::Create,
        value: U256::ZERO,
        input: Bytes::from(init_code),
        access_list: AccessList::default(),
        gas_price: Some(1_000_000_000),
        max_fee_per_gas: None,
        max_priority_fee_per_gas: None,
        max_fee_per_blob_gas: None,
        blob_versioned_hashes: Vec::new(),
        signature: TxSignature { r: U256::ZERO, s: U256::ZERO, odd_y_parity: false },
    };
    sign(from_key, unsigned)
}

fn call_put(index: u64, nonce: u64, from_key: &SecretKey, contract: Address, value: u64) -> TransactionSigned {
    let mut input = vec![0u8; 32];
    input[24..].copy_from_slice(&value.to_be_bytes());

    let unsigned = TransactionSigned {
        hash: B256::ZERO,
        index,
        tx_type: TxType::Legacy,
        chain_id: Some(CHAIN_ID),
        nonce,
        gas_limit: 60_000,
        to: TxKind::Call(contract),
        value: U256::ZERO,
        input: Bytes::from(input),
        access_list: AccessList::default(),
        gas_price: Some(1_000_000_000),
        max_fee_per_gas: None,
        max_priority_fee_per_gas: None,
        max_fee_per_blob_gas: None,
        blob_versioned_hashes: Vec::new(),
        signature: TxSignature { r: U256::ZERO, s: U256::ZERO, odd_y_parity: false },
    };
    sign(from_key, unsigned)
}

fn contract_address(deployer: Address, nonce: u64) -> Address {
    // CREATE address derivation: keccak256(rlp([sender, nonce]))[12..]
    let mut rlp_nonce = Vec::new();
    alloy_rlp::Encodable::encode(&nonce, &mut rlp_nonce);
    let mut payload = Vec::new();
    payload.push(0xc0 + 21 + rlp_nonce.len() as u8);
    payload.push(0x80 + 20);
    payload.extend_from_slice(deployer.as_slice());
    payload.extend_from_slice(&rlp_nonce);
    Address::from_slice(&keccak256(payload)[12..])
}

fn gas_cost(tx: &TransactionSigned) -> U256 {
    U256::from(tx.gas_limit) * U256::from(tx.gas_price.unwrap_or_default())
}

fn bare_header(number: u64, parent_hash: B256, state_root: B256, gas_used: u64, coinbase: Address) -> Header {
    Header {
        number,
        hash: B256::ZERO,
        parent_hash,
        uncle_hash: B256::ZERO,
        state_root,
        transactions_root: B256::ZERO,
        receipts_root: B256::ZERO,
        logs_bloom: Default::default(),
        beneficiary: coinbase,
        difficulty: U256::ZERO,
        gas_limit: 8_000_000,
        gas_used,
        timestamp: 1_700_000_000 + number * 12,
        extra_data: Bytes::new(),
        mix_hash: B256::ZERO,
        nonce: Default::default(),
        base_fee_per_gas: None,
        withdrawals_root: None,
        blob_gas_used: None,
        excess_blob_gas: None,
        parent_beacon_block_root: None,
    }
}

fn header_hash(header: &Header) -> B256 {
    // Not a real Ethereum header RLP hash; a stable fixture-local identity
    // is enough since these fixtures never cross-check against mainnet data.
    keccak256([header.number.to_be_bytes().as_slice(), header.state_root.as_slice(), header.parent_hash.as_slice()].concat())
}

/// The generated chain: its blocks and the account state resulting after
/// each one, so seeding code can populate `eth.state_accounts`/`storage_cids`
/// per height rather than only at the tip.
pub struct GeneratedChain {
    pub chain_config: ChainConfig,
    pub genesis_hash: B256,
    pub genesis_state: BTreeMap<Address, AccountState>,
    pub blocks: Vec<Block>,
    pub state_by_height: Vec<BTreeMap<Address, AccountState>>,
    pub contract: Address,
    pub accounts: Accounts,
}

/// Builds the literal ten-block scenario: block 1 funds account1 from the
/// bank; block 2 forwards a slice to account2 and deploys the storage
/// contract; blocks 3-5 call `Put(3)`, `Put(9)`, `Put(0)`; blocks 6-10 are
/// empty, padding the chain for trail-distance tests.
pub fn generate() -> GeneratedChain {
    let accounts = Accounts::default();
    let mut state = BTreeMap::new();
    state.insert(
        accounts.bank,
        AccountState { nonce: 0, balance: U256::from(10u64).pow(U256::from(24u64)), code_hash: B256::ZERO, storage: BTreeMap::new() },
    );

    let chain_config = ChainConfig::permissive_default();
    let genesis_hash = B256::repeat_byte(0xee);
    let genesis_state = state.clone();

    let mut blocks = Vec::new();
    let mut state_by_height = Vec::new();
    let mut parent_hash = genesis_hash;
    let mut bank_nonce = 0u64;
    let mut account1_nonce = 0u64;
    let mut contract = Address::ZERO;

    push_block(
        1,
        vec![transfer(0, bank_nonce, &accounts.bank_key, accounts.account1, 10_000)],
        &accounts,
        &mut contract,
        &mut state,
        &mut parent_hash,
        &mut blocks,
        &mut state_by_height,
    );
    bank_nonce += 1;

    let block2_txs = vec![
        transfer(0, bank_nonce, &accounts.bank_key, accounts.account1, 1_000),
        transfer(1, account1_nonce, &accounts.account1_key, accounts.account2, 1_000),
        deploy_contract(2, account1_nonce + 1, &accounts.account1_key),
    ];
    push_block(2, block2_txs, &accounts, &mut contract, &mut state, &mut parent_hash, &mut blocks, &mut state_by_height);
    account1_nonce += 2;

    for (i, value) in [3u64, 9, 0].into_iter().enumerate() {
        push_block(
            3 + i as u64,
            vec![call_put(0, account1_nonce, &accounts.account1_key, contract, value)],
            &accounts,
            &mut contract,
            &mut state,
            &mut parent_hash,
            &mut blocks,
            &mut state_by_height,
        );
        account1_nonce += 1;
    }

    for n in 6..=10u64 {
        push_block(n, Vec::new(), &accounts, &mut contract, &mut state, &mut parent_hash, &mut blocks, &mut state_by_height);
    }

    GeneratedChain { chain_config, genesis_hash, genesis_state, blocks, state_by_height, contract, accounts }
}

/// Applies one block's transactions to `state`, links it onto `parent_hash`,
/// and records both the block and the resulting state snapshot.
#[allow(clippy::too_many_arguments)]
fn push_block(
    number: u64,
    txs: Vec<TransactionSigned>,
    accounts: &Accounts,
    contract: &mut Address,
    state: &mut BTreeMap<Address, AccountState>,
    parent_hash: &mut B256,
    blocks: &mut Vec<Block>,
    state_by_height: &mut Vec<BTreeMap<Address, AccountState>>,
) {
    let mut gas_used = 0u64;
    for tx in &txs {
        let cost = gas_cost(tx);
        if let Some(sender_state) = state.get_mut(&tx_sender(accounts, tx)) {
            sender_state.balance = sender_state.balance.saturating_sub(tx.value).saturating_sub(cost);
            sender_state.nonce += 1;
        }
        if let TxKind::Call(to) = tx.to {
            state.entry(to).or_default().balance += tx.value;
            if to == *contract && !tx.input.is_empty() {
                let mut slot = [0u8; 32];
                slot.copy_from_slice(&tx.input[..32]);
                state.entry(*contract).or_default().storage.insert(U256::ZERO, U256::from_be_bytes(slot));
            }
        } else if tx.to == TxKind::Create {
            let deployed = contract_address(tx_sender(accounts, tx), tx.nonce);
            state.insert(deployed, AccountState { nonce: 1, balance: U256::ZERO, code_hash: keccak256(RUNTIME_CODE), storage: BTreeMap::new() });
            *contract = deployed;
        }
        gas_used += 21_000.max(tx.gas_limit.min(60_000));
    }

    let state_root = compute_state_root(state);
    let mut header = bare_header(number, *parent_hash, state_root, gas_used, accounts.bank);
    header.hash = header_hash(&header);
    *parent_hash = header.hash;

    blocks.push(Block { header, body: BlockBody { transactions: txs, uncles: Vec::new(), withdrawals: None } });
    state_by_height.push(state.clone());
}

fn tx_sender(accounts: &Accounts, tx: &TransactionSigned) -> Address {
    // The fixture only ever signs with two keys; recovering via signature
    // would work too but this avoids the cost for a generator that already
    // knows which key signed each transaction.
    if tx.recover_signer().map(|a| a == accounts.bank).unwrap_or(false) {
        accounts.bank
    } else {
        accounts.account1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_ten_blocks_in_order() {
        let chain = generate();
        assert_eq!(chain.blocks.len(), 10);
        for (i, block) in chain.blocks.iter().enumerate() {
            assert_eq!(block.number(), i as u64 + 1);
        }
    }

    #[test]
    fn block_two_deploys_the_contract() {
        let chain = generate();
        assert_ne!(chain.contract, Address::ZERO);
        let state = chain.state_by_height.last().unwrap();
        assert!(state.contains_key(&chain.contract));
    }

    #[test]
    fn put_calls_update_contract_storage() {
        let chain = generate();
        let final_state = chain.state_by_height.last().unwrap();
        let contract_state = &final_state[&chain.contract];
        assert_eq!(contract_state.storage.get(&U256::ZERO), Some(&U256::ZERO));
    }

    #[test]
    fn state_roots_change_while_transactions_are_present() {
        // Blocks 1-5 carry transactions and each change the state root;
        // blocks 6-10 are empty padding and repeat block 5's root.
        let chain = generate();
        let roots: Vec<_> = chain.blocks[..5].iter().map(|b| b.header.state_root).collect();
        for pair in roots.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }
}
