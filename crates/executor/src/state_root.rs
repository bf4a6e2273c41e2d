//! Recomputes a post-execution state root from the full account/storage set.
//!
//! The index keeps decoded account and storage leaves rather than raw trie
//! node bytes, so there's no existing trie to mutate incrementally; instead
//! this rebuilds the trie from scratch over every account and slot at the
//! target height. That's the right tradeoff for the bounded state sizes this
//! validator is exercised against — a full incremental trie (reading and
//! rewriting individual nodes keyed by hash) would only pay for itself
//! against mainnet-scale state.

use std::collections::BTreeMap;

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_rlp::Encodable;
use alloy_trie::{HashBuilder, Nibbles};
use validator_state::AccountState;

/// `keccak256("")`, the code hash every account without code carries in a
/// real trie leaf. The index stores [`B256::ZERO`] as its own sentinel for
/// "no code" (see `IndexStateDb::fetch_account`); that sentinel never goes
/// into a trie leaf itself.
fn empty_code_hash() -> B256 {
    B256::from_slice(revm::primitives::KECCAK_EMPTY.as_slice())
}

/// EIP-161 emptiness: zero nonce, zero balance, no code. Empty accounts are
/// pruned from the trie rather than encoded as zero-value leaves — the
/// "delete empty accounts" rule the intermediate root must be computed
/// under.
fn is_empty_account(account: &AccountState) -> bool {
    account.nonce == 0 && account.balance.is_zero() && (account.code_hash == B256::ZERO || account.code_hash == empty_code_hash())
}

#[derive(alloy_rlp::RlpEncodable)]
struct AccountRlp {
    nonce: u64,
    balance: U256,
    storage_root: B256,
    code_hash: B256,
}

fn storage_root(storage: &BTreeMap<U256, U256>) -> B256 {
    let mut entries: Vec<(Nibbles, Vec<u8>)> = storage
        .iter()
        .filter(|(_, v)| !v.is_zero())
        .map(|(slot, value)| {
            let key = keccak256(B256::from(slot.to_be_bytes()));
            let mut rlp_value = Vec::new();
            value.encode(&mut rlp_value);
            (Nibbles::unpack(key), rlp_value)
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    if entries.is_empty() {
        return alloy_trie::EMPTY_ROOT_HASH;
    }

    let mut builder = HashBuilder::default();
    for (path, value) in entries {
        builder.add_leaf(path, &value);
    }
    builder.root()
}

/// Computes the state root over the given post-execution account set.
///
/// `accounts` must contain every account in the state, not just the ones
/// touched by the re-executed block — untouched accounts contribute to the
/// root exactly as they did before execution. Empty accounts (zero nonce,
/// zero balance, no code — e.g. a just-selfdestructed account, or a reward
/// beneficiary that never received anything) are left out of the trie
/// entirely rather than encoded as zero-value leaves.
pub fn compute_state_root(accounts: &BTreeMap<Address, AccountState>) -> B256 {
    let mut entries: Vec<(Nibbles, Vec<u8>)> = accounts
        .iter()
        .filter(|(_, account)| !is_empty_account(account))
        .map(|(address, account)| {
            let key = keccak256(address);
            let code_hash = if account.code_hash == B256::ZERO { empty_code_hash() } else { account.code_hash };
            let leaf = AccountRlp { nonce: account.nonce, balance: account.balance, storage_root: storage_root(&account.storage), code_hash };
            let mut rlp_value = Vec::new();
            leaf.encode(&mut rlp_value);
            (Nibbles::unpack(key), rlp_value)
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    if entries.is_empty() {
        return alloy_trie::EMPTY_ROOT_HASH;
    }

    let mut builder = HashBuilder::default();
    for (path, value) in entries {
        builder.add_leaf(path, &value);
    }
    builder.root()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_state_has_the_canonical_empty_root() {
        let accounts = BTreeMap::new();
        assert_eq!(compute_state_root(&accounts), alloy_trie::EMPTY_ROOT_HASH);
    }

    #[test]
    fn adding_an_account_changes_the_root() {
        let mut accounts = BTreeMap::new();
        let empty_root = compute_state_root(&accounts);

        accounts.insert(
            Address::repeat_byte(0x01),
            AccountState { nonce: 1, balance: U256::from(100u64), code_hash: B256::ZERO, storage: BTreeMap::new() },
        );
        assert_ne!(compute_state_root(&accounts), empty_root);
    }

    #[test]
    fn storage_changes_change_the_account_leaf_and_therefore_the_root() {
        // A contract account: code present, so it isn't pruned as empty even
        // with a zero balance.
        let mut accounts = BTreeMap::new();
        accounts.insert(
            Address::repeat_byte(0x02),
            AccountState { nonce: 1, balance: U256::ZERO, code_hash: keccak256([0x60, 0x00]), storage: BTreeMap::new() },
        );
        let root_without_storage = compute_state_root(&accounts);

        accounts.get_mut(&Address::repeat_byte(0x02)).unwrap().storage.insert(U256::from(1u64), U256::from(42u64));
        assert_ne!(compute_state_root(&accounts), root_without_storage);
    }

    #[test]
    fn empty_accounts_are_pruned_from_the_trie() {
        let mut accounts = BTreeMap::new();
        let empty_root = compute_state_root(&accounts);

        accounts.insert(
            Address::repeat_byte(0x03),
            AccountState { nonce: 0, balance: U256::ZERO, code_hash: B256::ZERO, storage: BTreeMap::new() },
        );
        assert_eq!(compute_state_root(&accounts), empty_root);
    }

    #[test]
    fn codeless_accounts_hash_to_the_empty_code_hash_not_zero() {
        // Two codeless accounts with the same nonce/balance should produce
        // the same leaf whether their code hash was recorded as the index's
        // zero sentinel or the real empty-code keccak.
        let mut zero_sentinel = BTreeMap::new();
        zero_sentinel.insert(
            Address::repeat_byte(0x04),
            AccountState { nonce: 1, balance: U256::from(1u64), code_hash: B256::ZERO, storage: BTreeMap::new() },
        );
        let mut real_empty_hash = BTreeMap::new();
        real_empty_hash.insert(
            Address::repeat_byte(0x04),
            AccountState { nonce: 1, balance: U256::from(1u64), code_hash: empty_code_hash(), storage: BTreeMap::new() },
        );
        assert_eq!(compute_state_root(&zero_sentinel), compute_state_root(&real_empty_hash));
    }
}
