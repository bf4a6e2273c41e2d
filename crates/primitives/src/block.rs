use alloy_primitives::{Address, U256};

use crate::{header::Header, header::UncleHeader, transaction::TransactionSigned};

/// A withdrawal credited directly against an account's balance, as introduced
/// by EIP-4895. Shanghai+ blocks carry a (possibly empty) list of these
/// instead of any uncle-style reward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    pub index: u64,
    pub validator_index: u64,
    pub address: Address,
    /// Amount in Gwei, as carried on the wire; callers scale to wei before crediting.
    pub amount: u64,
}

/// Everything hung off a header besides the header itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockBody {
    pub transactions: Vec<TransactionSigned>,
    pub uncles: Vec<UncleHeader>,
    pub withdrawals: Option<Vec<Withdrawal>>,
}

/// A full block: header plus body, as assembled from the index for re-execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: Header,
    pub body: BlockBody,
}

impl Block {
    pub fn number(&self) -> u64 {
        self.header.number
    }

    /// Total ether (in wei) a `coinbase` collects from uncle inclusion, before
    /// the per-uncle reward paid directly to each uncle's own beneficiary.
    pub fn has_uncles(&self) -> bool {
        !self.body.uncles.is_empty()
    }

    /// Sum of the static call value transfers a block's withdrawals move,
    /// expressed in wei.
    pub fn withdrawals_value_wei(&self) -> U256 {
        self.body
            .withdrawals
            .as_ref()
            .map(|ws| {
                ws.iter()
                    .fold(U256::ZERO, |acc, w| acc + U256::from(w.amount) * U256::from(1_000_000_000u64))
            })
            .unwrap_or_default()
    }
}
