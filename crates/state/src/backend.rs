use alloy_primitives::Address;
use validator_errors::DbError;
use validator_primitives::Block;
use validator_query::DbPool;

use crate::db::IndexStateDb;

/// The block/author/state lookups the progression loop and the executor
/// need, gathered behind one handle over the index pool.
#[derive(Clone)]
pub struct StateBackend {
    pool: DbPool,
}

impl StateBackend {
    pub fn new(pool: DbPool) -> Self {
        StateBackend { pool }
    }

    pub async fn latest_height(&self) -> Result<Option<u64>, DbError> {
        validator_query::latest_height(&self.pool).await
    }

    pub async fn block(&self, block_number: u64) -> Result<Option<Block>, DbError> {
        validator_query::fetch_block(&self.pool, block_number).await
    }

    pub async fn author(&self, block_number: u64) -> Result<Option<Address>, DbError> {
        validator_query::fetch_author(&self.pool, block_number).await
    }

    /// A [`revm::Database`] reading account/storage state as of the parent of
    /// `block_number` — i.e. the state re-execution of `block_number` starts from.
    pub fn state_at_parent_of(&self, block_number: u64, runtime: tokio::runtime::Handle) -> IndexStateDb {
        IndexStateDb::new(self.pool.clone(), block_number.saturating_sub(1), runtime)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// The full account/storage set as of `block_number`, for rebuilding the
    /// state trie from scratch.
    pub async fn full_state(
        &self,
        block_number: u64,
    ) -> Result<std::collections::BTreeMap<Address, crate::account::AccountState>, DbError> {
        crate::account::fetch_full_state(&self.pool, block_number).await
    }
}
