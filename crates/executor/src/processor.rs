use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use revm::{
    primitives::{EVMError, ExecutionResult, ResultAndState},
    Evm,
};
use tracing::{debug, warn};
use validator_errors::ExecutionError;
use validator_primitives::{reward, Block, ChainConfig, Engine};
use validator_state::{AccountState, IndexStateDb};

use crate::env::{block_env, cfg_env, spec_id, tx_env};
use crate::state_root::compute_state_root;

/// Re-executes one block's transactions against the indexed state as of its
/// parent, applies the block's reward/withdrawal accrual, and reports
/// whether the resulting state root matches the header.
///
/// Mirrors the shape of a reth-style `EVMProcessor`: build the environment
/// once per block, replay each transaction through the same `Evm` instance,
/// then apply post-execution state changes that aren't themselves
/// transactions.
pub struct BlockProcessor {
    chain: ChainConfig,
}

impl BlockProcessor {
    pub fn new(chain: ChainConfig) -> Self {
        BlockProcessor { chain }
    }

    /// Executes `block` against `state_db`, starting from the full
    /// pre-state `accounts`, and returns the recomputed state root.
    ///
    /// `author` is the block's producer as resolved by the backend (§4.3) —
    /// read from the header's beneficiary field for the chains this
    /// validator targets, but kept as its own parameter rather than read
    /// off `block.header` directly so a future signature-recovering author
    /// source (e.g. Clique) only has to change the caller.
    pub fn execute(
        &self,
        block: &Block,
        author: Address,
        mut state_db: IndexStateDb,
        mut accounts: BTreeMap<Address, AccountState>,
    ) -> Result<alloy_primitives::B256, ExecutionError> {
        let header = &block.header;
        if header.number == 0 {
            return Err(ExecutionError::GenesisReexecution);
        }
        let spec = spec_id(&self.chain, header);
        let cfg = cfg_env(&self.chain);
        let block_env = block_env(header, author);

        let mut cumulative_gas_used = 0u64;

        for tx in &block.body.transactions {
            let sender = tx.recover_signer()?;
            let available_gas = header.gas_limit.saturating_sub(cumulative_gas_used);
            if tx.gas_limit > available_gas {
                return Err(ExecutionError::GasLimitExceeded {
                    block_number: header.number,
                    transaction_gas_limit: tx.gas_limit,
                    block_available_gas: available_gas,
                });
            }

            let tx_env = tx_env(tx, sender);
            let result = {
                let mut evm = Evm::builder()
                    .with_db(&mut state_db)
                    .with_spec_id(spec)
                    .modify_cfg_env(|c| *c = cfg.clone())
                    .modify_block_env(|b| *b = block_env.clone())
                    .modify_tx_env(|t| *t = tx_env)
                    .build();
                evm.transact().map_err(|err| map_evm_error(tx.hash, err))?
            };

            cumulative_gas_used += gas_used(&result);
            apply_result_state(&mut accounts, result);
            debug!(tx_hash = %tx.hash, gas_used = cumulative_gas_used, "applied transaction");
        }

        self.apply_post_execution_changes(block, author, &mut accounts);

        let computed = compute_state_root(&accounts);
        if computed != header.state_root {
            warn!(block_number = header.number, expected = %header.state_root, got = %computed, "state root mismatch");
            return Err(ExecutionError::StateRootMismatch {
                block_number: header.number,
                expected: header.state_root,
                got: computed,
            });
        }

        Ok(computed)
    }

    /// Block/uncle reward accrual and withdrawal crediting — state changes a
    /// block causes without being a transaction in its own right.
    fn apply_post_execution_changes(&self, block: &Block, author: Address, accounts: &mut BTreeMap<Address, AccountState>) {
        let header = &block.header;

        if matches!(self.chain.engine, Engine::Ethash) && !self.chain.hardforks.is_paris(header.number) {
            let base_reward = reward::base_block_reward(&self.chain.hardforks, header.number);
            let mut beneficiary_reward = base_reward;

            for uncle in &block.body.uncles {
                beneficiary_reward += reward::block_reward_per_uncle(base_reward);
                credit(accounts, uncle.beneficiary, reward::ommer_reward(base_reward, header.number, uncle.number));
            }

            credit(accounts, author, beneficiary_reward);
        }

        if let Some(withdrawals) = &block.body.withdrawals {
            for withdrawal in withdrawals {
                credit(accounts, withdrawal.address, U256::from(withdrawal.amount) * U256::from(1_000_000_000u64));
            }
        }
    }
}

fn credit(accounts: &mut BTreeMap<Address, AccountState>, address: Address, amount: U256) {
    accounts.entry(address).or_default().balance += amount;
}

fn gas_used(result: &ResultAndState) -> u64 {
    match &result.result {
        ExecutionResult::Success { gas_used, .. }
        | ExecutionResult::Revert { gas_used, .. }
        | ExecutionResult::Halt { gas_used, .. } => *gas_used,
    }
}

fn map_evm_error(hash: alloy_primitives::TxHash, err: EVMError<validator_errors::DbError>) -> ExecutionError {
    ExecutionError::Evm { hash, message: err.to_string() }
}

fn apply_result_state(accounts: &mut BTreeMap<Address, AccountState>, result: ResultAndState) {
    for (address, account) in result.state {
        if !account.is_touched() {
            continue;
        }
        let entry = accounts.entry(address).or_default();
        if account.is_selfdestructed() {
            *entry = AccountState::default();
            continue;
        }
        entry.nonce = account.info.nonce;
        entry.balance = U256::from_be_bytes(account.info.balance.to_be_bytes::<32>());
        entry.code_hash = alloy_primitives::B256::from_slice(account.info.code_hash.as_slice());
        for (slot, value) in account.storage {
            let key = U256::from_be_bytes(slot.to_be_bytes::<32>());
            let val = U256::from_be_bytes(value.present_value.to_be_bytes::<32>());
            entry.storage.insert(key, val);
        }
    }
}
