//! Assembly queries: reconstructing a [`Block`] (header, transactions,
//! receipts, logs, uncles, withdrawals) from the indexed CID tables.

use alloy_primitives::{Address, Bloom, Bytes, B256, B64, U256};
use sqlx::Row;
use validator_errors::DbError;
use validator_primitives::{
    AccessList, AccessListItem, Block, BlockBody, Header, Log, Receipt, TransactionSigned, TxKind, TxSignature,
    TxType, UncleHeader, Withdrawal,
};

use crate::pool::DbPool;

fn tx_type_from_i16(v: i16) -> TxType {
    match v {
        1 => TxType::Eip2930,
        2 => TxType::Eip1559,
        3 => TxType::Eip4844,
        _ => TxType::Legacy,
    }
}

fn header_from_row(row: &sqlx::postgres::PgRow) -> Result<Header, DbError> {
    Ok(Header {
        number: row.try_get::<i64, _>("block_number")? as u64,
        hash: B256::from_slice(row.try_get::<Vec<u8>, _>("block_hash")?.as_slice()),
        parent_hash: B256::from_slice(row.try_get::<Vec<u8>, _>("parent_hash")?.as_slice()),
        uncle_hash: B256::from_slice(row.try_get::<Vec<u8>, _>("uncle_root")?.as_slice()),
        state_root: B256::from_slice(row.try_get::<Vec<u8>, _>("state_root")?.as_slice()),
        transactions_root: B256::from_slice(row.try_get::<Vec<u8>, _>("tx_root")?.as_slice()),
        receipts_root: B256::from_slice(row.try_get::<Vec<u8>, _>("receipt_root")?.as_slice()),
        logs_bloom: Bloom::from_slice(row.try_get::<Vec<u8>, _>("bloom")?.as_slice()),
        beneficiary: Address::from_slice(row.try_get::<Vec<u8>, _>("coinbase")?.as_slice()),
        difficulty: U256::from_be_slice(row.try_get::<Vec<u8>, _>("td")?.as_slice()),
        gas_limit: row.try_get::<i64, _>("gas_limit")? as u64,
        gas_used: row.try_get::<i64, _>("gas_used")? as u64,
        timestamp: row.try_get::<i64, _>("timestamp")? as u64,
        extra_data: Bytes::from(row.try_get::<Vec<u8>, _>("extra_data")?),
        mix_hash: row
            .try_get::<Option<Vec<u8>>, _>("mix_digest")?
            .map(|b| B256::from_slice(&b))
            .unwrap_or_default(),
        nonce: row.try_get::<Option<Vec<u8>>, _>("nonce")?.map(|b| B64::from_slice(&b)).unwrap_or_default(),
        base_fee_per_gas: row.try_get::<Option<i64>, _>("base_fee")?.map(|v| v as u64),
        withdrawals_root: row.try_get::<Option<Vec<u8>>, _>("withdrawals_root")?.map(|b| B256::from_slice(&b)),
        blob_gas_used: row.try_get::<Option<i64>, _>("blob_gas_used")?.map(|v| v as u64),
        excess_blob_gas: row.try_get::<Option<i64>, _>("excess_blob_gas")?.map(|v| v as u64),
        parent_beacon_block_root: row
            .try_get::<Option<Vec<u8>>, _>("parent_beacon_block_root")?
            .map(|b| B256::from_slice(&b)),
    })
}

/// Fetches the canonical header at `block_number`, if indexed.
pub async fn fetch_header(db: &DbPool, block_number: u64) -> Result<Option<Header>, DbError> {
    let row = sqlx::query(
        "SELECT block_number, block_hash, parent_hash, uncle_root, state_root, tx_root, receipt_root, bloom, \
         coinbase, td, gas_limit, gas_used, timestamp, extra_data, mix_digest, nonce, base_fee, withdrawals_root, \
         blob_gas_used, excess_blob_gas, parent_beacon_block_root \
         FROM eth.header_cids WHERE block_number = $1 AND is_canonical = true",
    )
    .bind(block_number as i64)
    .fetch_optional(db.inner())
    .await?;

    row.as_ref().map(header_from_row).transpose()
}

/// Highest canonical block number currently indexed.
pub async fn latest_height(db: &DbPool) -> Result<Option<u64>, DbError> {
    let height: Option<i64> =
        sqlx::query_scalar("SELECT MAX(block_number) FROM eth.header_cids WHERE is_canonical = true")
            .fetch_one(db.inner())
            .await?;
    Ok(height.map(|h| h as u64))
}

/// Fetches the beneficiary address recorded at `block_number`, used to
/// attribute an imported block to its producer without recovering it from a
/// Clique signature.
pub async fn fetch_author(db: &DbPool, block_number: u64) -> Result<Option<Address>, DbError> {
    let coinbase: Option<Vec<u8>> = sqlx::query_scalar(
        "SELECT coinbase FROM eth.header_cids WHERE block_number = $1 AND is_canonical = true",
    )
    .bind(block_number as i64)
    .fetch_optional(db.inner())
    .await?;
    Ok(coinbase.map(|b| Address::from_slice(&b)))
}

async fn fetch_uncles(db: &DbPool, block_number: u64) -> Result<Vec<UncleHeader>, DbError> {
    let rows = sqlx::query(
        "SELECT block_number, block_hash, parent_hash, uncle_root, state_root, tx_root, receipt_root, bloom, \
         coinbase, td, gas_limit, gas_used, timestamp, extra_data, mix_digest, nonce, base_fee, withdrawals_root, \
         blob_gas_used, excess_blob_gas, parent_beacon_block_root \
         FROM eth.uncle_cids WHERE block_number = $1",
    )
    .bind(block_number as i64)
    .fetch_all(db.inner())
    .await?;

    rows.iter().map(header_from_row).collect()
}

async fn fetch_access_list(db: &DbPool, tx_hash: &[u8]) -> Result<AccessList, DbError> {
    let rows = sqlx::query("SELECT address, storage_keys FROM eth.access_list_elements WHERE tx_id = $1 ORDER BY index")
        .bind(tx_hash)
        .fetch_all(db.inner())
        .await?;

    let items = rows
        .into_iter()
        .map(|row| {
            let address: Vec<u8> = row.try_get("address")?;
            let storage_keys: Vec<Vec<u8>> = row.try_get("storage_keys")?;
            Ok(AccessListItem {
                address: Address::from_slice(&address),
                storage_keys: storage_keys.iter().map(|k| B256::from_slice(k)).collect(),
            })
        })
        .collect::<Result<Vec<_>, DbError>>()?;

    Ok(AccessList(items))
}

async fn fetch_transactions(db: &DbPool, block_number: u64) -> Result<Vec<TransactionSigned>, DbError> {
    let rows = sqlx::query(
        "SELECT tx_hash, index, tx_type, chain_id, nonce, gas_limit, dst, value, input_data, gas_price, \
         max_fee_per_gas, max_priority_fee_per_gas, max_fee_per_blob_gas, blob_versioned_hashes, r, s, v \
         FROM eth.transaction_cids WHERE block_number = $1 ORDER BY index",
    )
    .bind(block_number as i64)
    .fetch_all(db.inner())
    .await?;

    let mut txs = Vec::with_capacity(rows.len());
    for row in rows {
        let tx_hash: Vec<u8> = row.try_get("tx_hash")?;
        let dst: Option<Vec<u8>> = row.try_get("dst")?;
        let r: Vec<u8> = row.try_get("r")?;
        let s: Vec<u8> = row.try_get("s")?;
        let v: i64 = row.try_get("v")?;
        let blob_hashes: Vec<Vec<u8>> = row.try_get::<Option<Vec<Vec<u8>>>, _>("blob_versioned_hashes")?.unwrap_or_default();

        let access_list = fetch_access_list(db, &tx_hash).await?;

        txs.push(TransactionSigned {
            hash: B256::from_slice(&tx_hash),
            index: row.try_get::<i32, _>("index")? as u64,
            tx_type: tx_type_from_i16(row.try_get("tx_type")?),
            chain_id: row.try_get::<Option<i64>, _>("chain_id")?.map(|c| c as u64),
            nonce: row.try_get::<i64, _>("nonce")? as u64,
            gas_limit: row.try_get::<i64, _>("gas_limit")? as u64,
            to: TxKind::from(dst.map(|d| Address::from_slice(&d))),
            value: U256::from_be_slice(row.try_get::<Vec<u8>, _>("value")?.as_slice()),
            input: Bytes::from(row.try_get::<Vec<u8>, _>("input_data")?),
            access_list,
            gas_price: row.try_get::<Option<i64>, _>("gas_price")?.map(|v| v as u128),
            max_fee_per_gas: row.try_get::<Option<i64>, _>("max_fee_per_gas")?.map(|v| v as u128),
            max_priority_fee_per_gas: row.try_get::<Option<i64>, _>("max_priority_fee_per_gas")?.map(|v| v as u128),
            max_fee_per_blob_gas: row.try_get::<Option<i64>, _>("max_fee_per_blob_gas")?.map(|v| v as u128),
            blob_versioned_hashes: blob_hashes.iter().map(|b| B256::from_slice(b)).collect(),
            signature: TxSignature {
                r: U256::from_be_slice(&r),
                s: U256::from_be_slice(&s),
                odd_y_parity: v & 1 == 1,
            },
        });
    }
    Ok(txs)
}

async fn fetch_withdrawals(db: &DbPool, block_number: u64) -> Result<Option<Vec<Withdrawal>>, DbError> {
    let rows =
        sqlx::query("SELECT index, validator_index, address, amount FROM eth.withdrawal_cids WHERE block_number = $1 ORDER BY index")
            .bind(block_number as i64)
            .fetch_all(db.inner())
            .await?;

    if rows.is_empty() {
        return Ok(None);
    }

    let withdrawals = rows
        .into_iter()
        .map(|row| {
            let address: Vec<u8> = row.try_get("address")?;
            Ok(Withdrawal {
                index: row.try_get::<i64, _>("index")? as u64,
                validator_index: row.try_get::<i64, _>("validator_index")? as u64,
                address: Address::from_slice(&address),
                amount: row.try_get::<i64, _>("amount")? as u64,
            })
        })
        .collect::<Result<Vec<_>, DbError>>()?;

    Ok(Some(withdrawals))
}

/// Assembles the full block (header + body) needed to re-execute `block_number`.
pub async fn fetch_block(db: &DbPool, block_number: u64) -> Result<Option<Block>, DbError> {
    let Some(header) = fetch_header(db, block_number).await? else {
        return Ok(None);
    };

    let transactions = fetch_transactions(db, block_number).await?;
    let uncles = fetch_uncles(db, block_number).await?;
    let withdrawals = fetch_withdrawals(db, block_number).await?;

    Ok(Some(Block { header, body: BlockBody { transactions, uncles, withdrawals } }))
}

async fn fetch_logs(db: &DbPool, tx_hash: &[u8]) -> Result<Vec<Log>, DbError> {
    let rows = sqlx::query("SELECT address, topics, log_data FROM eth.log_cids WHERE rct_id = $1 ORDER BY index")
        .bind(tx_hash)
        .fetch_all(db.inner())
        .await?;

    rows.into_iter()
        .map(|row| {
            let address: Vec<u8> = row.try_get("address")?;
            let topics: Vec<Vec<u8>> = row.try_get("topics")?;
            let data: Vec<u8> = row.try_get("log_data")?;
            Ok(Log { address: Address::from_slice(&address), topics: topics.iter().map(|t| B256::from_slice(t)).collect(), data: Bytes::from(data) })
        })
        .collect()
}

/// Fetches the receipts recorded for `block_number`, in transaction order.
pub async fn fetch_receipts(db: &DbPool, block_number: u64) -> Result<Vec<Receipt>, DbError> {
    let rows = sqlx::query(
        "SELECT tx_id, tx_type, post_state, post_status, cumulative_gas_used, log_bloom \
         FROM eth.receipt_cids WHERE block_number = $1 ORDER BY index",
    )
    .bind(block_number as i64)
    .fetch_all(db.inner())
    .await?;

    let mut receipts = Vec::with_capacity(rows.len());
    for row in rows {
        let tx_id: Vec<u8> = row.try_get("tx_id")?;
        let logs = fetch_logs(db, &tx_id).await?;
        let status: Option<i16> = row.try_get("post_status")?;
        receipts.push(Receipt {
            tx_type: tx_type_from_i16(row.try_get("tx_type")?),
            success: status.map(|s| s == 1).unwrap_or(true),
            cumulative_gas_used: row.try_get::<i64, _>("cumulative_gas_used")? as u64,
            logs,
            bloom: Bloom::from_slice(row.try_get::<Vec<u8>, _>("log_bloom")?.as_slice()),
        });
    }
    Ok(receipts)
}
