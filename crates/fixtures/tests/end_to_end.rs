//! Exercises the real query, state, executor, and integrity crates end to
//! end against a live Postgres instance seeded with the generated chain.
//!
//! Needs a reachable database: set `VALIDATOR_TEST_DATABASE_URL` to a
//! Postgres connection string with permission to create and drop a schema
//! (e.g. `postgres://postgres@localhost/validator_test`). Tests no-op with a
//! message when the variable isn't set, the same way a CI job without a
//! database service would skip them.

use sqlx::PgPool;
use validator_executor::BlockProcessor;
use validator_fixtures::{generate, Seeder};
use validator_query::DbPool;
use validator_state::StateBackend;

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("VALIDATOR_TEST_DATABASE_URL").ok()?;
    Some(PgPool::connect(&url).await.expect("failed to connect to VALIDATOR_TEST_DATABASE_URL"))
}

macro_rules! require_db {
    () => {
        match test_pool().await {
            Some(pool) => pool,
            None => {
                eprintln!("skipping: VALIDATOR_TEST_DATABASE_URL not set");
                return;
            }
        }
    };
}

/// Re-executes every block of `chain` in order and runs the referential
/// integrity audit at each height, exactly as [`ProgressionLoop::validate`]
/// would.
async fn validate_every_block(
    backend: &StateBackend,
    processor: &BlockProcessor,
    blocks: &[validator_primitives::Block],
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Handle::current();
    for block in blocks {
        let block_number = block.header.number;
        let author = backend.author(block_number).await?.unwrap_or(block.header.beneficiary);
        let pre_state = backend.full_state(block_number.saturating_sub(1)).await?;
        let state_db = backend.state_at_parent_of(block_number, runtime.clone());
        processor.execute(block, author, state_db, pre_state)?;
        validator_integrity::validate_referential_integrity(backend.pool(), block_number).await?;
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn happy_path_chain_validates_cleanly() {
    let pool = require_db!();
    let seeder = Seeder::new(&pool);
    seeder.reset_schema().await.unwrap();

    let chain = generate();
    seeder.seed_all(&chain).await.unwrap();

    let backend = StateBackend::new(DbPool::from_pool(pool));
    let processor = BlockProcessor::new(chain.chain_config.clone());

    validate_every_block(&backend, &processor, &chain.blocks).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_ipld_block_is_reported_as_a_referential_gap() {
    let pool = require_db!();
    let seeder = Seeder::new(&pool);
    seeder.reset_schema().await.unwrap();

    let chain = generate();
    seeder.seed_with_missing_ipld_block(&chain, 3).await.unwrap();

    let backend = StateBackend::new(DbPool::from_pool(pool));
    let err = validator_integrity::validate_referential_integrity(backend.pool(), 3).await.unwrap_err();

    assert!(matches!(err, validator_errors::IntegrityError::Gap { block_number: 3, .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn block_not_yet_indexed_is_reported_as_missing_not_a_gap() {
    let pool = require_db!();
    let seeder = Seeder::new(&pool);
    seeder.reset_schema().await.unwrap();

    let chain = generate();
    seeder.seed_all_but_header(&chain, 4).await.unwrap();

    let backend = StateBackend::new(DbPool::from_pool(pool));
    assert!(backend.block(4).await.unwrap().is_none());

    // Surrounding blocks are unaffected: the gap is a hole in the index's
    // progress, not a dangling reference anywhere else.
    assert!(backend.block(3).await.unwrap().is_some());
    assert!(backend.block(5).await.unwrap().is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn corrupted_state_root_fails_reexecution() {
    let pool = require_db!();
    let seeder = Seeder::new(&pool);
    seeder.reset_schema().await.unwrap();

    let mut chain = generate();
    chain.blocks[0].header.state_root = alloy_primitives::B256::repeat_byte(0xaa);
    seeder.seed_all(&chain).await.unwrap();

    let backend = StateBackend::new(DbPool::from_pool(pool));
    let processor = BlockProcessor::new(chain.chain_config.clone());
    let runtime = tokio::runtime::Handle::current();

    let block = &chain.blocks[0];
    let author = backend.author(block.header.number).await.unwrap().unwrap_or(block.header.beneficiary);
    let pre_state = backend.full_state(0).await.unwrap();
    let state_db = backend.state_at_parent_of(block.header.number, runtime);

    let err = processor.execute(block, author, state_db, pre_state).unwrap_err();
    assert!(matches!(err, validator_errors::ExecutionError::StateRootMismatch { block_number: 1, .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn trail_holds_the_cursor_back_from_the_indexed_tip() {
    let pool = require_db!();
    let seeder = Seeder::new(&pool);
    seeder.reset_schema().await.unwrap();

    let chain = generate();
    seeder.seed_all(&chain).await.unwrap();

    let backend = StateBackend::new(DbPool::from_pool(pool));
    let latest = backend.latest_height().await.unwrap().unwrap();
    assert_eq!(latest, 10);

    // Mirrors the cursor check in the progression loop: with a trail of 5,
    // the cursor may advance only up to latest - trail.
    let trail = 5u64;
    let cutoff = latest.saturating_sub(trail);
    assert_eq!(cutoff, 5);
    assert!(backend.block(cutoff).await.unwrap().is_some());
    assert!(cutoff + 1 <= latest);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_block_is_detectable_for_a_backfill_request() {
    let pool = require_db!();
    let seeder = Seeder::new(&pool);
    seeder.reset_schema().await.unwrap();

    let chain = generate();
    seeder.seed_all_but_header(&chain, 7).await.unwrap();

    let backend = StateBackend::new(DbPool::from_pool(pool));
    // This is exactly the condition `ProgressionLoop::evaluate` uses to
    // decide a backfill request is due; the RPC dispatch itself needs a
    // live upstream node and isn't exercised here.
    assert!(backend.block(7).await.unwrap().is_none());
    assert!(backend.latest_height().await.unwrap().unwrap() >= 7);
}
