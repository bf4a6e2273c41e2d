//! Anti-join probes over the indexed tables.
//!
//! Each probe runs a `LEFT JOIN ... WHERE parent.key IS NULL` anti-join
//! between a child table and the parent table it's supposed to reference,
//! restricted to one block height, and reports whether any row in the child
//! table is missing its match. A `true` result is a referential integrity
//! gap.

use validator_errors::DbError;

const CIDS_REF_IPLD_BLOCKS: &str = r#"
SELECT EXISTS (
    SELECT * FROM {table}
    LEFT JOIN public.blocks ON (
        {table}.{key_column} = blocks.key
        AND {table}.block_number = blocks.block_number
    )
    WHERE {table}.block_number = $1
      AND blocks.key IS NULL
)"#;

const UNCLE_CIDS_REF_HEADER_CIDS: &str = r#"
SELECT EXISTS (
    SELECT * FROM eth.uncle_cids
    LEFT JOIN eth.header_cids ON (
        uncle_cids.header_id = header_cids.block_hash
        AND uncle_cids.block_number = header_cids.block_number
    )
    WHERE uncle_cids.block_number = $1
      AND header_cids.block_hash IS NULL
)"#;

const TRANSACTION_CIDS_REF_HEADER_CIDS: &str = r#"
SELECT EXISTS (
    SELECT * FROM eth.transaction_cids
    LEFT JOIN eth.header_cids ON (
        transaction_cids.header_id = header_cids.block_hash
        AND transaction_cids.block_number = header_cids.block_number
    )
    WHERE transaction_cids.block_number = $1
      AND header_cids.block_hash IS NULL
)"#;

const RECEIPT_CIDS_REF_TRANSACTION_CIDS: &str = r#"
SELECT EXISTS (
    SELECT * FROM eth.receipt_cids
    LEFT JOIN eth.transaction_cids ON (
        receipt_cids.tx_id = transaction_cids.tx_hash
        AND receipt_cids.block_number = transaction_cids.block_number
    )
    WHERE receipt_cids.block_number = $1
      AND transaction_cids.tx_hash IS NULL
)"#;

const STATE_CIDS_REF_HEADER_CIDS: &str = r#"
SELECT EXISTS (
    SELECT * FROM eth.state_cids
    LEFT JOIN eth.header_cids ON (
        state_cids.header_id = header_cids.block_hash
        AND state_cids.block_number = header_cids.block_number
    )
    WHERE state_cids.block_number = $1
      AND header_cids.block_hash IS NULL
)"#;

const STORAGE_CIDS_REF_STATE_CIDS: &str = r#"
SELECT EXISTS (
    SELECT * FROM eth.storage_cids
    LEFT JOIN eth.state_cids ON (
        storage_cids.state_path = state_cids.state_path
        AND storage_cids.header_id = state_cids.header_id
        AND storage_cids.block_number = state_cids.block_number
    )
    WHERE storage_cids.block_number = $1
      AND state_cids.state_path IS NULL
)"#;

const STATE_ACCOUNTS_REF_STATE_CIDS: &str = r#"
SELECT EXISTS (
    SELECT * FROM eth.state_accounts
    LEFT JOIN eth.state_cids ON (
        state_accounts.state_path = state_cids.state_path
        AND state_accounts.header_id = state_cids.header_id
        AND state_accounts.block_number = state_cids.block_number
    )
    WHERE state_accounts.block_number = $1
      AND state_cids.state_path IS NULL
)"#;

const ACCESS_LIST_ELEMENTS_REF_TRANSACTION_CIDS: &str = r#"
SELECT EXISTS (
    SELECT * FROM eth.access_list_elements
    LEFT JOIN eth.transaction_cids ON (
        access_list_elements.tx_id = transaction_cids.tx_hash
        AND access_list_elements.block_number = transaction_cids.block_number
    )
    WHERE access_list_elements.block_number = $1
      AND transaction_cids.tx_hash IS NULL
)"#;

const LOG_CIDS_REF_RECEIPT_CIDS: &str = r#"
SELECT EXISTS (
    SELECT * FROM eth.log_cids
    LEFT JOIN eth.receipt_cids ON (
        log_cids.rct_id = receipt_cids.tx_id
        AND log_cids.block_number = receipt_cids.block_number
    )
    WHERE log_cids.block_number = $1
      AND receipt_cids.tx_id IS NULL
)"#;

/// A CID table that carries a multihash key into `public.blocks`, along with
/// the name of the column holding that key (`mh_key` for most tables,
/// `leaf_mh_key` for receipts and logs, which key by their RLP leaf rather
/// than the CID itself).
#[derive(Debug, Clone, Copy)]
pub struct CidTable {
    pub table: &'static str,
    pub key_column: &'static str,
}

impl CidTable {
    pub const HEADER: CidTable = CidTable { table: "eth.header_cids", key_column: "mh_key" };
    pub const UNCLE: CidTable = CidTable { table: "eth.uncle_cids", key_column: "mh_key" };
    pub const TRANSACTION: CidTable = CidTable { table: "eth.transaction_cids", key_column: "mh_key" };
    pub const RECEIPT: CidTable = CidTable { table: "eth.receipt_cids", key_column: "leaf_mh_key" };
    pub const STATE: CidTable = CidTable { table: "eth.state_cids", key_column: "mh_key" };
    pub const STORAGE: CidTable = CidTable { table: "eth.storage_cids", key_column: "mh_key" };
    pub const LOG: CidTable = CidTable { table: "eth.log_cids", key_column: "leaf_mh_key" };
}

/// Checks whether any row of `table` at `block_number` lacks a matching
/// `public.blocks` row for its IPLD payload.
///
/// Generic over the executor so the auditor can run every probe against the
/// same open transaction rather than a fresh pool connection per query.
pub async fn ipld_blocks_gap<'e, E>(executor: E, block_number: u64, table: CidTable) -> Result<bool, DbError>
where
    E: sqlx::PgExecutor<'e>,
{
    let query = CIDS_REF_IPLD_BLOCKS.replace("{table}", table.table).replace("{key_column}", table.key_column);
    let gap: bool = sqlx::query_scalar(&query).bind(block_number as i64).fetch_one(executor).await?;
    Ok(gap)
}

macro_rules! probe {
    ($name:ident, $sql:expr) => {
        pub async fn $name<'e, E>(executor: E, block_number: u64) -> Result<bool, DbError>
        where
            E: sqlx::PgExecutor<'e>,
        {
            let gap: bool = sqlx::query_scalar($sql).bind(block_number as i64).fetch_one(executor).await?;
            Ok(gap)
        }
    };
}

probe!(uncle_cids_ref_header_cids, UNCLE_CIDS_REF_HEADER_CIDS);
probe!(transaction_cids_ref_header_cids, TRANSACTION_CIDS_REF_HEADER_CIDS);
probe!(receipt_cids_ref_transaction_cids, RECEIPT_CIDS_REF_TRANSACTION_CIDS);
probe!(state_cids_ref_header_cids, STATE_CIDS_REF_HEADER_CIDS);
probe!(storage_cids_ref_state_cids, STORAGE_CIDS_REF_STATE_CIDS);
probe!(state_accounts_ref_state_cids, STATE_ACCOUNTS_REF_STATE_CIDS);
probe!(access_list_elements_ref_transaction_cids, ACCESS_LIST_ELEMENTS_REF_TRANSACTION_CIDS);
probe!(log_cids_ref_receipt_cids, LOG_CIDS_REF_RECEIPT_CIDS);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipld_blocks_query_substitutes_table_and_key_column() {
        let query = CIDS_REF_IPLD_BLOCKS.replace("{table}", CidTable::RECEIPT.table).replace(
            "{key_column}",
            CidTable::RECEIPT.key_column,
        );
        assert!(query.contains("eth.receipt_cids.leaf_mh_key"));
        assert!(!query.contains("{table}"));
    }
}
