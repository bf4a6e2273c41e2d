//! Runs the ordered suite of anti-join probes that catch a chain index with
//! rows in a child table pointing at a parent row that was never written
//! (or was written and then lost).
//!
//! The ordering mirrors how the tables reference each other: headers are
//! checked first since every other table ultimately hangs off one, followed
//! by each child table against its immediate parent, with an IPLD-blocks
//! check interleaved wherever a table carries a CID into `public.blocks`.

use sqlx::Postgres;
use tracing::debug;
use validator_errors::IntegrityError;
use validator_query::integrity::{self, CidTable};
use validator_query::DbPool;

type Tx<'a> = sqlx::Transaction<'a, Postgres>;

macro_rules! check {
    ($tx:expr, $block_number:expr, $probe:path, $child:literal, $parent:literal) => {
        if $probe(&mut **$tx, $block_number).await? {
            return Err(IntegrityError::Gap { block_number: $block_number, child: $child, parent: $parent });
        }
    };
}

async fn check_ipld_blocks(tx: &mut Tx<'_>, block_number: u64, table: CidTable, child: &'static str) -> Result<(), IntegrityError> {
    if integrity::ipld_blocks_gap(&mut **tx, block_number, table).await? {
        return Err(IntegrityError::Gap { block_number, child, parent: "public.blocks" });
    }
    Ok(())
}

/// Runs every referential integrity check at `block_number` inside a single
/// read-only transaction, so the whole suite sees one consistent snapshot
/// even while the indexer keeps writing. Returns the first gap found.
pub async fn validate_referential_integrity(db: &DbPool, block_number: u64) -> Result<(), IntegrityError> {
    debug!(block_number, "running referential integrity suite");

    let mut tx = db.inner().begin().await.map_err(validator_errors::DbError::from)?;
    sqlx::query("SET TRANSACTION READ ONLY").execute(&mut *tx).await.map_err(validator_errors::DbError::from)?;

    check_ipld_blocks(&mut tx, block_number, CidTable::HEADER, "eth.header_cids").await?;

    check!(&mut tx, block_number, integrity::uncle_cids_ref_header_cids, "eth.uncle_cids", "eth.header_cids");
    check_ipld_blocks(&mut tx, block_number, CidTable::UNCLE, "eth.uncle_cids").await?;

    check!(&mut tx, block_number, integrity::transaction_cids_ref_header_cids, "eth.transaction_cids", "eth.header_cids");
    check_ipld_blocks(&mut tx, block_number, CidTable::TRANSACTION, "eth.transaction_cids").await?;

    check!(&mut tx, block_number, integrity::receipt_cids_ref_transaction_cids, "eth.receipt_cids", "eth.transaction_cids");
    check_ipld_blocks(&mut tx, block_number, CidTable::RECEIPT, "eth.receipt_cids").await?;

    check!(&mut tx, block_number, integrity::state_cids_ref_header_cids, "eth.state_cids", "eth.header_cids");
    check_ipld_blocks(&mut tx, block_number, CidTable::STATE, "eth.state_cids").await?;

    check!(&mut tx, block_number, integrity::storage_cids_ref_state_cids, "eth.storage_cids", "eth.state_cids");
    check_ipld_blocks(&mut tx, block_number, CidTable::STORAGE, "eth.storage_cids").await?;

    check!(&mut tx, block_number, integrity::state_accounts_ref_state_cids, "eth.state_accounts", "eth.state_cids");

    check!(
        &mut tx,
        block_number,
        integrity::access_list_elements_ref_transaction_cids,
        "eth.access_list_elements",
        "eth.transaction_cids"
    );

    check!(&mut tx, block_number, integrity::log_cids_ref_receipt_cids, "eth.log_cids", "eth.receipt_cids");
    check_ipld_blocks(&mut tx, block_number, CidTable::LOG, "eth.log_cids").await?;

    // Read-only snapshot: nothing was written, so roll back rather than
    // commit — there's no state to persist and this makes the no-op explicit.
    tx.rollback().await.map_err(validator_errors::DbError::from)?;
    Ok(())
}
