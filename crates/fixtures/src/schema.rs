//! DDL for a throwaway schema matching the column layout
//! [`validator_query`](validator_query) and
//! [`validator_integrity`](../../integrity/src/lib.rs) read. Real deployments
//! point at a schema an indexer already populated; tests create and drop one
//! of these per run.

pub const CREATE_SCHEMA: &str = r#"
CREATE SCHEMA IF NOT EXISTS eth;

CREATE TABLE IF NOT EXISTS public.blocks (
    key BYTEA NOT NULL,
    data BYTEA NOT NULL,
    block_number BIGINT NOT NULL,
    PRIMARY KEY (key, block_number)
);

CREATE TABLE IF NOT EXISTS eth.header_cids (
    block_number BIGINT NOT NULL,
    block_hash BYTEA NOT NULL,
    parent_hash BYTEA NOT NULL,
    uncle_root BYTEA NOT NULL,
    state_root BYTEA NOT NULL,
    tx_root BYTEA NOT NULL,
    receipt_root BYTEA NOT NULL,
    bloom BYTEA NOT NULL,
    coinbase BYTEA NOT NULL,
    td BYTEA NOT NULL,
    gas_limit BIGINT NOT NULL,
    gas_used BIGINT NOT NULL,
    timestamp BIGINT NOT NULL,
    extra_data BYTEA NOT NULL,
    mix_digest BYTEA,
    nonce BYTEA,
    base_fee BIGINT,
    withdrawals_root BYTEA,
    blob_gas_used BIGINT,
    excess_blob_gas BIGINT,
    parent_beacon_block_root BYTEA,
    mh_key BYTEA NOT NULL,
    is_canonical BOOLEAN NOT NULL DEFAULT true,
    PRIMARY KEY (block_number, block_hash)
);

CREATE TABLE IF NOT EXISTS eth.uncle_cids (
    block_number BIGINT NOT NULL,
    block_hash BYTEA NOT NULL,
    header_id BYTEA NOT NULL,
    parent_hash BYTEA NOT NULL,
    uncle_root BYTEA NOT NULL,
    state_root BYTEA NOT NULL,
    tx_root BYTEA NOT NULL,
    receipt_root BYTEA NOT NULL,
    bloom BYTEA NOT NULL,
    coinbase BYTEA NOT NULL,
    td BYTEA NOT NULL,
    gas_limit BIGINT NOT NULL,
    gas_used BIGINT NOT NULL,
    timestamp BIGINT NOT NULL,
    extra_data BYTEA NOT NULL,
    mix_digest BYTEA,
    nonce BYTEA,
    base_fee BIGINT,
    withdrawals_root BYTEA,
    blob_gas_used BIGINT,
    excess_blob_gas BIGINT,
    parent_beacon_block_root BYTEA,
    mh_key BYTEA NOT NULL,
    PRIMARY KEY (block_number, block_hash)
);

CREATE TABLE IF NOT EXISTS eth.transaction_cids (
    block_number BIGINT NOT NULL,
    header_id BYTEA NOT NULL,
    tx_hash BYTEA NOT NULL,
    index INT NOT NULL,
    tx_type SMALLINT NOT NULL,
    chain_id BIGINT,
    nonce BIGINT NOT NULL,
    gas_limit BIGINT NOT NULL,
    dst BYTEA,
    value BYTEA NOT NULL,
    input_data BYTEA NOT NULL,
    gas_price BIGINT,
    max_fee_per_gas BIGINT,
    max_priority_fee_per_gas BIGINT,
    max_fee_per_blob_gas BIGINT,
    blob_versioned_hashes BYTEA[],
    r BYTEA NOT NULL,
    s BYTEA NOT NULL,
    v BIGINT NOT NULL,
    mh_key BYTEA NOT NULL,
    PRIMARY KEY (block_number, tx_hash)
);

CREATE TABLE IF NOT EXISTS eth.access_list_elements (
    block_number BIGINT NOT NULL,
    tx_id BYTEA NOT NULL,
    index INT NOT NULL,
    address BYTEA NOT NULL,
    storage_keys BYTEA[] NOT NULL,
    PRIMARY KEY (block_number, tx_id, index)
);

CREATE TABLE IF NOT EXISTS eth.receipt_cids (
    block_number BIGINT NOT NULL,
    tx_id BYTEA NOT NULL,
    index INT NOT NULL,
    tx_type SMALLINT NOT NULL,
    post_state BYTEA,
    post_status SMALLINT,
    cumulative_gas_used BIGINT NOT NULL,
    log_bloom BYTEA NOT NULL,
    leaf_mh_key BYTEA NOT NULL,
    PRIMARY KEY (block_number, tx_id)
);

CREATE TABLE IF NOT EXISTS eth.log_cids (
    block_number BIGINT NOT NULL,
    rct_id BYTEA NOT NULL,
    index INT NOT NULL,
    address BYTEA NOT NULL,
    topics BYTEA[] NOT NULL,
    log_data BYTEA NOT NULL,
    leaf_mh_key BYTEA NOT NULL,
    PRIMARY KEY (block_number, rct_id, index)
);

CREATE TABLE IF NOT EXISTS eth.state_cids (
    block_number BIGINT NOT NULL,
    header_id BYTEA NOT NULL,
    state_path BYTEA NOT NULL,
    state_leaf_key BYTEA NOT NULL,
    mh_key BYTEA NOT NULL,
    PRIMARY KEY (block_number, header_id, state_path)
);

CREATE TABLE IF NOT EXISTS eth.state_accounts (
    block_number BIGINT NOT NULL,
    header_id BYTEA NOT NULL,
    state_path BYTEA NOT NULL,
    state_leaf_key BYTEA NOT NULL,
    address BYTEA NOT NULL,
    balance BYTEA NOT NULL,
    nonce BIGINT NOT NULL,
    code_hash BYTEA NOT NULL,
    storage_root BYTEA NOT NULL,
    PRIMARY KEY (block_number, header_id, state_path)
);

CREATE TABLE IF NOT EXISTS eth.storage_cids (
    block_number BIGINT NOT NULL,
    header_id BYTEA NOT NULL,
    state_path BYTEA NOT NULL,
    state_leaf_key BYTEA NOT NULL,
    storage_path BYTEA NOT NULL,
    storage_leaf_key BYTEA NOT NULL,
    storage_slot BYTEA NOT NULL,
    storage_value BYTEA NOT NULL,
    mh_key BYTEA NOT NULL,
    PRIMARY KEY (block_number, state_path, storage_path)
);

CREATE TABLE IF NOT EXISTS eth.withdrawal_cids (
    block_number BIGINT NOT NULL,
    header_id BYTEA NOT NULL,
    index BIGINT NOT NULL,
    validator_index BIGINT NOT NULL,
    address BYTEA NOT NULL,
    amount BIGINT NOT NULL,
    PRIMARY KEY (block_number, index)
);
"#;

pub const DROP_SCHEMA: &str = "DROP SCHEMA IF EXISTS eth CASCADE; DROP TABLE IF EXISTS public.blocks;";
