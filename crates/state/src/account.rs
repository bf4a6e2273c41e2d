use std::collections::BTreeMap;

use alloy_primitives::{Address, B256, U256};
use sqlx::Row;
use validator_errors::DbError;
use validator_query::DbPool;

/// The post-execution value of one account: balance, nonce, code hash, and
/// every storage slot the index has recorded for it.
#[derive(Debug, Clone, Default)]
pub struct AccountState {
    pub nonce: u64,
    pub balance: U256,
    pub code_hash: B256,
    pub storage: BTreeMap<U256, U256>,
}

/// Loads every account and storage slot indexed at or before `block_number`,
/// keeping only each key's most recent value — the full state the trie root
/// is computed over.
pub async fn fetch_full_state(pool: &DbPool, block_number: u64) -> Result<BTreeMap<Address, AccountState>, DbError> {
    let account_rows = sqlx::query(
        "SELECT DISTINCT ON (sa.state_leaf_key) sa.address, sa.balance, sa.nonce, sa.code_hash \
         FROM eth.state_accounts sa \
         JOIN eth.state_cids sc ON sa.state_path = sc.state_path AND sa.header_id = sc.header_id \
         WHERE sa.block_number <= $1 \
         ORDER BY sa.state_leaf_key, sa.block_number DESC",
    )
    .bind(block_number as i64)
    .fetch_all(pool.inner())
    .await?;

    let mut accounts = BTreeMap::new();
    for row in account_rows {
        let address: Vec<u8> = row.try_get("address")?;
        let balance: Vec<u8> = row.try_get("balance")?;
        let code_hash: Vec<u8> = row.try_get("code_hash")?;
        accounts.insert(
            Address::from_slice(&address),
            AccountState {
                nonce: row.try_get::<i64, _>("nonce")? as u64,
                balance: U256::from_be_slice(&balance),
                code_hash: B256::from_slice(&code_hash),
                storage: BTreeMap::new(),
            },
        );
    }

    let storage_rows = sqlx::query(
        "SELECT DISTINCT ON (st.state_leaf_key, st.storage_leaf_key) sa.address, st.storage_slot, st.storage_value \
         FROM eth.storage_cids st \
         JOIN eth.state_cids sc ON st.state_path = sc.state_path AND st.header_id = sc.header_id \
         JOIN eth.state_accounts sa ON sa.state_path = sc.state_path AND sa.header_id = sc.header_id \
         WHERE st.block_number <= $1 \
         ORDER BY st.state_leaf_key, st.storage_leaf_key, st.block_number DESC",
    )
    .bind(block_number as i64)
    .fetch_all(pool.inner())
    .await?;

    for row in storage_rows {
        let address: Vec<u8> = row.try_get("address")?;
        let slot: Vec<u8> = row.try_get("storage_slot")?;
        let value: Vec<u8> = row.try_get("storage_value")?;
        if let Some(account) = accounts.get_mut(&Address::from_slice(&address)) {
            account.storage.insert(U256::from_be_slice(&slot), U256::from_be_slice(&value));
        }
    }

    Ok(accounts)
}
