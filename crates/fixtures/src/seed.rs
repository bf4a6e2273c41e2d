//! Writes a [`GeneratedChain`](crate::chain::GeneratedChain) into a live
//! Postgres database using the same table layout
//! [`validator_query`](validator_query) reads, so integration tests exercise
//! the real query and executor crates end to end.

use alloy_primitives::keccak256;
use sqlx::PgPool;
use validator_primitives::{Block, TxKind};

use crate::chain::GeneratedChain;
use crate::schema::{CREATE_SCHEMA, DROP_SCHEMA};

/// Drops and recreates the fixture schema, then inserts every block and its
/// state snapshot. `omit_blocks` lets a test simulate a referential gap by
/// skipping specific heights' IPLD and/or state rows after the header is
/// still written — see [`omit_header`](Self::omit_header) for omitting the
/// header entirely.
pub struct Seeder<'a> {
    pool: &'a PgPool,
}

impl<'a> Seeder<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Seeder { pool }
    }

    pub async fn reset_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(DROP_SCHEMA).execute(self.pool).await?;
        sqlx::query(CREATE_SCHEMA).execute(self.pool).await?;
        Ok(())
    }

    /// Inserts every block in `chain`, along with its per-height account and
    /// storage state. Block 0 carries the pre-funded genesis state that
    /// block 1's re-execution starts from; it has no header row since
    /// nothing ever validates "block 0".
    pub async fn seed_all(&self, chain: &GeneratedChain) -> Result<(), sqlx::Error> {
        self.insert_state(0, &chain.genesis_state).await?;
        for (i, block) in chain.blocks.iter().enumerate() {
            self.insert_block(block).await?;
            self.insert_state(block.number(), &chain.state_by_height[i]).await?;
        }
        Ok(())
    }

    /// Inserts every block except `skip_height`, which is left out of every
    /// table entirely — simulating an indexer cursor that hasn't reached
    /// that height yet, rather than a referential gap at an already-indexed
    /// height.
    pub async fn seed_all_but_header(&self, chain: &GeneratedChain, skip_height: u64) -> Result<(), sqlx::Error> {
        self.insert_state(0, &chain.genesis_state).await?;
        for (i, block) in chain.blocks.iter().enumerate() {
            if block.number() == skip_height {
                continue;
            }
            self.insert_block(block).await?;
            self.insert_state(block.number(), &chain.state_by_height[i]).await?;
        }
        Ok(())
    }

    /// Inserts every block's header and transactions, but skips writing the
    /// `public.blocks` IPLD row for `skip_height`'s header — simulating a
    /// dangling `mh_key` reference.
    pub async fn seed_with_missing_ipld_block(&self, chain: &GeneratedChain, skip_height: u64) -> Result<(), sqlx::Error> {
        self.insert_state(0, &chain.genesis_state).await?;
        for (i, block) in chain.blocks.iter().enumerate() {
            self.insert_header(&block.header, block.number() != skip_height).await?;
            self.insert_transactions(block).await?;
            self.insert_state(block.number(), &chain.state_by_height[i]).await?;
        }
        Ok(())
    }

    async fn insert_block(&self, block: &Block) -> Result<(), sqlx::Error> {
        self.insert_header(&block.header, true).await?;
        self.insert_transactions(block).await?;
        Ok(())
    }

    async fn insert_header(&self, header: &validator_primitives::Header, with_ipld_block: bool) -> Result<(), sqlx::Error> {
        let mh_key = format!("header-{}", header.number).into_bytes();

        sqlx::query(
            "INSERT INTO eth.header_cids (block_number, block_hash, parent_hash, uncle_root, state_root, tx_root, \
             receipt_root, bloom, coinbase, td, gas_limit, gas_used, timestamp, extra_data, mix_digest, nonce, \
             base_fee, withdrawals_root, blob_gas_used, excess_blob_gas, parent_beacon_block_root, mh_key) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22)",
        )
        .bind(header.number as i64)
        .bind(header.hash.as_slice())
        .bind(header.parent_hash.as_slice())
        .bind(header.uncle_hash.as_slice())
        .bind(header.state_root.as_slice())
        .bind(header.transactions_root.as_slice())
        .bind(header.receipts_root.as_slice())
        .bind(header.logs_bloom.as_slice())
        .bind(header.beneficiary.as_slice())
        .bind(header.difficulty.to_be_bytes::<32>().to_vec())
        .bind(header.gas_limit as i64)
        .bind(header.gas_used as i64)
        .bind(header.timestamp as i64)
        .bind(header.extra_data.to_vec())
        .bind(header.mix_hash.as_slice())
        .bind(header.nonce.as_slice())
        .bind(header.base_fee_per_gas.map(|v| v as i64))
        .bind(header.withdrawals_root.map(|r| r.to_vec()))
        .bind(header.blob_gas_used.map(|v| v as i64))
        .bind(header.excess_blob_gas.map(|v| v as i64))
        .bind(header.parent_beacon_block_root.map(|r| r.to_vec()))
        .bind(mh_key.clone())
        .execute(self.pool)
        .await?;

        if with_ipld_block {
            self.insert_ipld_block(header.number, &mh_key, header.hash.as_slice()).await?;
        }
        Ok(())
    }

    async fn insert_ipld_block(&self, block_number: u64, key: &[u8], payload: &[u8]) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO public.blocks (key, data, block_number) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING")
            .bind(key)
            .bind(payload)
            .bind(block_number as i64)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    async fn insert_transactions(&self, block: &Block) -> Result<(), sqlx::Error> {
        for tx in &block.body.transactions {
            let mh_key = format!("tx-{}-{}", block.number(), tx.index).into_bytes();
            let dst = match tx.to {
                TxKind::Call(addr) => Some(addr.to_vec()),
                TxKind::Create => None,
            };
            let v: i64 = if tx.signature.odd_y_parity { 1 } else { 0 };

            sqlx::query(
                "INSERT INTO eth.transaction_cids (block_number, header_id, tx_hash, index, tx_type, chain_id, \
                 nonce, gas_limit, dst, value, input_data, gas_price, max_fee_per_gas, max_priority_fee_per_gas, \
                 max_fee_per_blob_gas, blob_versioned_hashes, r, s, v, mh_key) \
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20)",
            )
            .bind(block.number() as i64)
            .bind(block.header.hash.as_slice())
            .bind(tx.hash.as_slice())
            .bind(tx.index as i32)
            .bind(tx.tx_type as i16)
            .bind(tx.chain_id.map(|c| c as i64))
            .bind(tx.nonce as i64)
            .bind(tx.gas_limit as i64)
            .bind(dst)
            .bind(tx.value.to_be_bytes::<32>().to_vec())
            .bind(tx.input.to_vec())
            .bind(tx.gas_price.map(|v| v as i64))
            .bind(tx.max_fee_per_gas.map(|v| v as i64))
            .bind(tx.max_priority_fee_per_gas.map(|v| v as i64))
            .bind(tx.max_fee_per_blob_gas.map(|v| v as i64))
            .bind(None::<Vec<Vec<u8>>>)
            .bind(tx.signature.r.to_be_bytes::<32>().to_vec())
            .bind(tx.signature.s.to_be_bytes::<32>().to_vec())
            .bind(v)
            .bind(mh_key)
            .execute(self.pool)
            .await?;

            for (i, item) in tx.access_list.0.iter().enumerate() {
                let storage_keys: Vec<Vec<u8>> = item.storage_keys.iter().map(|k| k.to_vec()).collect();
                sqlx::query(
                    "INSERT INTO eth.access_list_elements (block_number, tx_id, index, address, storage_keys) \
                     VALUES ($1,$2,$3,$4,$5)",
                )
                .bind(block.number() as i64)
                .bind(tx.hash.as_slice())
                .bind(i as i32)
                .bind(item.address.to_vec())
                .bind(storage_keys)
                .execute(self.pool)
                .await?;
            }
        }
        Ok(())
    }

    async fn insert_state(&self, block_number: u64, accounts: &std::collections::BTreeMap<alloy_primitives::Address, validator_state::AccountState>) -> Result<(), sqlx::Error> {
        let header_id = format!("header-{block_number}").into_bytes();

        for (address, account) in accounts {
            let state_leaf_key = keccak256(address.as_slice());
            let state_path = state_leaf_key.as_slice().to_vec();
            let state_mh_key = format!("state-{block_number}-{address}").into_bytes();

            sqlx::query(
                "INSERT INTO eth.state_cids (block_number, header_id, state_path, state_leaf_key, mh_key) \
                 VALUES ($1,$2,$3,$4,$5)",
            )
            .bind(block_number as i64)
            .bind(&header_id)
            .bind(&state_path)
            .bind(state_leaf_key.to_vec())
            .bind(state_mh_key)
            .execute(self.pool)
            .await?;

            sqlx::query(
                "INSERT INTO eth.state_accounts (block_number, header_id, state_path, state_leaf_key, address, \
                 balance, nonce, code_hash, storage_root) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)",
            )
            .bind(block_number as i64)
            .bind(&header_id)
            .bind(&state_path)
            .bind(state_leaf_key.to_vec())
            .bind(address.to_vec())
            .bind(account.balance.to_be_bytes::<32>().to_vec())
            .bind(account.nonce as i64)
            .bind(account.code_hash.to_vec())
            .bind(vec![0u8; 32])
            .execute(self.pool)
            .await?;

            for (slot, value) in &account.storage {
                let storage_leaf_key = keccak256(slot.to_be_bytes::<32>());
                let storage_path = storage_leaf_key.as_slice().to_vec();
                let storage_mh_key = format!("storage-{block_number}-{address}-{slot}").into_bytes();

                sqlx::query(
                    "INSERT INTO eth.storage_cids (block_number, header_id, state_path, state_leaf_key, \
                     storage_path, storage_leaf_key, storage_slot, storage_value, mh_key) \
                     VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)",
                )
                .bind(block_number as i64)
                .bind(&header_id)
                .bind(&state_path)
                .bind(state_leaf_key.to_vec())
                .bind(&storage_path)
                .bind(storage_leaf_key.to_vec())
                .bind(slot.to_be_bytes::<32>().to_vec())
                .bind(value.to_be_bytes::<32>().to_vec())
                .bind(storage_mh_key)
                .execute(self.pool)
                .await?;
            }
        }
        Ok(())
    }
}
