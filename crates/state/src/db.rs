use alloy_primitives::{keccak256, Address, B256, U256};
use revm::primitives::{AccountInfo, Bytecode, B256 as RevmB256};
use revm::{Database, DatabaseRef};
use sqlx::Row;
use tracing::trace;
use validator_errors::DbError;
use validator_query::DbPool;

/// A read-only [`revm::Database`] over the chain index, pinned to the state
/// as of one block height.
///
/// Every write the EVM issues during execution lands in revm's own
/// in-memory `CacheDB`/journal, never here: this type only ever answers
/// reads, the same guarantee the indexed `ethdb.Database` wrapper gave the
/// original validator. `block_in_place` lets these trait methods stay
/// synchronous (as `revm::Database` requires) while still driving the async
/// `sqlx` pool underneath; it requires a multi-threaded tokio runtime.
#[derive(Clone)]
pub struct IndexStateDb {
    pool: DbPool,
    block_number: u64,
    runtime: tokio::runtime::Handle,
}

impl IndexStateDb {
    pub fn new(pool: DbPool, block_number: u64, runtime: tokio::runtime::Handle) -> Self {
        IndexStateDb { pool, block_number, runtime }
    }

    fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        tokio::task::block_in_place(|| self.runtime.block_on(fut))
    }

    // `state_leaf_key`/`storage_leaf_key` hold the trie path (keccak256 of the
    // plaintext key), matching how the index stores account and storage
    // leaves; every lookup has to hash its input before matching against them.
    async fn fetch_account(&self, address: Address) -> Result<Option<AccountInfo>, DbError> {
        let leaf_key = keccak256(address.as_slice());
        let row = sqlx::query(
            "SELECT balance, nonce, code_hash FROM eth.state_accounts sa \
             JOIN eth.state_cids sc ON sa.state_path = sc.state_path AND sa.header_id = sc.header_id \
             WHERE sa.block_number <= $1 AND sc.state_leaf_key = $2 \
             ORDER BY sa.block_number DESC LIMIT 1",
        )
        .bind(self.block_number as i64)
        .bind(leaf_key.as_slice())
        .fetch_optional(self.pool.inner())
        .await?;

        let Some(row) = row else { return Ok(None) };
        let balance: Vec<u8> = row.try_get("balance")?;
        let nonce: i64 = row.try_get("nonce")?;
        let code_hash: Vec<u8> = row.try_get("code_hash")?;

        let code_hash = B256::from_slice(&code_hash);
        let bytecode = if code_hash == B256::ZERO {
            None
        } else {
            self.fetch_code(code_hash).await?
        };

        Ok(Some(AccountInfo {
            balance: revm::primitives::U256::from_be_slice(&balance),
            nonce: nonce as u64,
            code_hash: RevmB256::from_slice(code_hash.as_slice()),
            code: bytecode,
        }))
    }

    async fn fetch_code(&self, code_hash: B256) -> Result<Option<Bytecode>, DbError> {
        let data: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT data FROM public.blocks WHERE key = $1").bind(code_hash.as_slice()).fetch_optional(self.pool.inner()).await?;
        Ok(data.map(|bytes| Bytecode::new_raw(bytes.into())))
    }

    async fn fetch_storage(&self, address: Address, slot: U256) -> Result<U256, DbError> {
        let account_leaf_key = keccak256(address.as_slice());
        let storage_leaf_key = keccak256(B256::from(slot.to_be_bytes()));
        let value: Option<Vec<u8>> = sqlx::query_scalar(
            "SELECT storage_value FROM eth.storage_cids st \
             JOIN eth.state_cids sc ON st.state_path = sc.state_path AND st.header_id = sc.header_id \
             WHERE st.block_number <= $1 AND sc.state_leaf_key = $2 AND st.storage_leaf_key = $3 \
             ORDER BY st.block_number DESC LIMIT 1",
        )
        .bind(self.block_number as i64)
        .bind(account_leaf_key.as_slice())
        .bind(storage_leaf_key.as_slice())
        .fetch_optional(self.pool.inner())
        .await?;

        Ok(value.map(|v| U256::from_be_slice(&v)).unwrap_or_default())
    }

    async fn fetch_block_hash(&self, number: u64) -> Result<B256, DbError> {
        let hash: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT block_hash FROM eth.header_cids WHERE block_number = $1 AND is_canonical = true")
                .bind(number as i64)
                .fetch_optional(self.pool.inner())
                .await?;
        Ok(hash.map(|h| B256::from_slice(&h)).unwrap_or_default())
    }
}

impl Database for IndexStateDb {
    type Error = DbError;

    fn basic(&mut self, address: Address) -> Result<Option<AccountInfo>, Self::Error> {
        trace!(?address, block = self.block_number, "state read: account");
        self.block_on(self.fetch_account(address))
    }

    fn code_by_hash(&mut self, code_hash: RevmB256) -> Result<Bytecode, Self::Error> {
        let hash = B256::from_slice(code_hash.as_slice());
        Ok(self.block_on(self.fetch_code(hash))?.unwrap_or_default())
    }

    fn storage(&mut self, address: Address, index: U256) -> Result<U256, Self::Error> {
        self.block_on(self.fetch_storage(address, index))
    }

    fn block_hash(&mut self, number: U256) -> Result<RevmB256, Self::Error> {
        let hash = self.block_on(self.fetch_block_hash(number.to::<u64>()))?;
        Ok(RevmB256::from_slice(hash.as_slice()))
    }
}

impl DatabaseRef for IndexStateDb {
    type Error = DbError;

    fn basic_ref(&self, address: Address) -> Result<Option<AccountInfo>, Self::Error> {
        self.block_on(self.fetch_account(address))
    }

    fn code_by_hash_ref(&self, code_hash: RevmB256) -> Result<Bytecode, Self::Error> {
        let hash = B256::from_slice(code_hash.as_slice());
        Ok(self.block_on(self.fetch_code(hash))?.unwrap_or_default())
    }

    fn storage_ref(&self, address: Address, index: U256) -> Result<U256, Self::Error> {
        self.block_on(self.fetch_storage(address, index))
    }

    fn block_hash_ref(&self, number: U256) -> Result<RevmB256, Self::Error> {
        let hash = self.block_on(self.fetch_block_hash(number.to::<u64>()))?;
        Ok(RevmB256::from_slice(hash.as_slice()))
    }
}
