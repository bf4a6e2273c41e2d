use alloy_primitives::{keccak256, Address, Bytes, TxHash, B256, U256};
use alloy_rlp::{BufMut, Encodable, RlpEncodable, RlpEncodableWrapper};
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, SECP256K1,
};
use validator_errors::ExecutionError;

/// An account address to call, or the marker for a contract-creation transaction.
///
/// RLP-encodes as a 20-byte string when calling an account, or as the empty
/// string when creating a contract — the quirk every legacy/typed Ethereum
/// transaction signing payload relies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxKind {
    Call(Address),
    Create,
}

impl TxKind {
    pub fn to(&self) -> Option<Address> {
        match self {
            TxKind::Call(addr) => Some(*addr),
            TxKind::Create => None,
        }
    }
}

impl From<Option<Address>> for TxKind {
    fn from(to: Option<Address>) -> Self {
        match to {
            Some(addr) => TxKind::Call(addr),
            None => TxKind::Create,
        }
    }
}

impl Encodable for TxKind {
    fn encode(&self, out: &mut dyn BufMut) {
        match self {
            TxKind::Call(addr) => addr.encode(out),
            TxKind::Create => out.put_u8(alloy_rlp::EMPTY_STRING_CODE),
        }
    }

    fn length(&self) -> usize {
        match self {
            TxKind::Call(addr) => addr.length(),
            TxKind::Create => 1,
        }
    }
}

/// A single EIP-2930 access list entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, RlpEncodable)]
pub struct AccessListItem {
    pub address: Address,
    pub storage_keys: Vec<B256>,
}

/// The access list carried by EIP-2930+ transactions. Empty for legacy transactions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, RlpEncodableWrapper)]
pub struct AccessList(pub Vec<AccessListItem>);

/// The transaction type byte, as defined by EIP-2718.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TxType {
    Legacy = 0,
    Eip2930 = 1,
    Eip1559 = 2,
    Eip4844 = 3,
}

/// The `(v, r, s)` signature carried by a signed transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxSignature {
    pub r: U256,
    pub s: U256,
    /// The recovery id, normalized to `0`/`1`. For legacy transactions signed
    /// before EIP-155 this is the raw `v - 27`; for EIP-155 legacy
    /// transactions and all typed transactions it's carried separately from
    /// `chain_id`.
    pub odd_y_parity: bool,
}

/// A transaction as reconstructed from the index, together with its signature
/// and its position within the block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionSigned {
    pub hash: TxHash,
    pub index: u64,
    pub tx_type: TxType,
    /// `None` for pre-EIP-155 legacy transactions.
    pub chain_id: Option<u64>,
    pub nonce: u64,
    pub gas_limit: u64,
    pub to: TxKind,
    pub value: U256,
    pub input: Bytes,
    pub access_list: AccessList,
    /// Legacy / EIP-2930 gas price.
    pub gas_price: Option<u128>,
    /// EIP-1559+ fee cap.
    pub max_fee_per_gas: Option<u128>,
    /// EIP-1559+ priority fee cap.
    pub max_priority_fee_per_gas: Option<u128>,
    /// EIP-4844 blob fee cap.
    pub max_fee_per_blob_gas: Option<u128>,
    /// EIP-4844 versioned blob hashes.
    pub blob_versioned_hashes: Vec<B256>,
    pub signature: TxSignature,
}

#[derive(RlpEncodable)]
struct LegacyUnprotected<'a> {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: TxKind,
    value: U256,
    input: &'a Bytes,
}

#[derive(RlpEncodable)]
struct LegacyEip155<'a> {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: TxKind,
    value: U256,
    input: &'a Bytes,
    chain_id: u64,
    zero1: u8,
    zero2: u8,
}

#[derive(RlpEncodable)]
struct Eip2930Payload<'a> {
    chain_id: u64,
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: TxKind,
    value: U256,
    input: &'a Bytes,
    access_list: &'a AccessList,
}

#[derive(RlpEncodable)]
struct Eip1559Payload<'a> {
    chain_id: u64,
    nonce: u64,
    max_priority_fee_per_gas: u128,
    max_fee_per_gas: u128,
    gas_limit: u64,
    to: TxKind,
    value: U256,
    input: &'a Bytes,
    access_list: &'a AccessList,
}

#[derive(RlpEncodable)]
struct Eip4844Payload<'a> {
    chain_id: u64,
    nonce: u64,
    max_priority_fee_per_gas: u128,
    max_fee_per_gas: u128,
    gas_limit: u64,
    to: Address,
    value: U256,
    input: &'a Bytes,
    access_list: &'a AccessList,
    max_fee_per_blob_gas: u128,
    blob_versioned_hashes: &'a Vec<B256>,
}

impl TransactionSigned {
    /// The digest that was signed to produce [`TxSignature`].
    ///
    /// Legacy transactions without a `chain_id` sign the bare field list;
    /// EIP-155 legacy and every typed transaction sign a chain-id-bound
    /// payload, with typed transactions additionally prefixing the RLP with
    /// their EIP-2718 type byte.
    pub fn signature_hash(&self) -> B256 {
        let mut buf = Vec::new();
        match self.tx_type {
            TxType::Legacy => match self.chain_id {
                None => LegacyUnprotected {
                    nonce: self.nonce,
                    gas_price: self.gas_price.unwrap_or_default(),
                    gas_limit: self.gas_limit,
                    to: self.to,
                    value: self.value,
                    input: &self.input,
                }
                .encode(&mut buf),
                Some(chain_id) => LegacyEip155 {
                    nonce: self.nonce,
                    gas_price: self.gas_price.unwrap_or_default(),
                    gas_limit: self.gas_limit,
                    to: self.to,
                    value: self.value,
                    input: &self.input,
                    chain_id,
                    zero1: 0,
                    zero2: 0,
                }
                .encode(&mut buf),
            },
            TxType::Eip2930 => {
                buf.put_u8(TxType::Eip2930 as u8);
                Eip2930Payload {
                    chain_id: self.chain_id.unwrap_or_default(),
                    nonce: self.nonce,
                    gas_price: self.gas_price.unwrap_or_default(),
                    gas_limit: self.gas_limit,
                    to: self.to,
                    value: self.value,
                    input: &self.input,
                    access_list: &self.access_list,
                }
                .encode(&mut buf);
            }
            TxType::Eip1559 => {
                buf.put_u8(TxType::Eip1559 as u8);
                Eip1559Payload {
                    chain_id: self.chain_id.unwrap_or_default(),
                    nonce: self.nonce,
                    max_priority_fee_per_gas: self.max_priority_fee_per_gas.unwrap_or_default(),
                    max_fee_per_gas: self.max_fee_per_gas.unwrap_or_default(),
                    gas_limit: self.gas_limit,
                    to: self.to,
                    value: self.value,
                    input: &self.input,
                    access_list: &self.access_list,
                }
                .encode(&mut buf);
            }
            TxType::Eip4844 => {
                buf.put_u8(TxType::Eip4844 as u8);
                Eip4844Payload {
                    chain_id: self.chain_id.unwrap_or_default(),
                    nonce: self.nonce,
                    max_priority_fee_per_gas: self.max_priority_fee_per_gas.unwrap_or_default(),
                    max_fee_per_gas: self.max_fee_per_gas.unwrap_or_default(),
                    gas_limit: self.gas_limit,
                    to: self.to.to().unwrap_or_default(),
                    value: self.value,
                    input: &self.input,
                    access_list: &self.access_list,
                    max_fee_per_blob_gas: self.max_fee_per_blob_gas.unwrap_or_default(),
                    blob_versioned_hashes: &self.blob_versioned_hashes,
                }
                .encode(&mut buf);
            }
        }
        keccak256(buf)
    }

    /// Recovers the sending account's address from the signature over
    /// [`Self::signature_hash`].
    pub fn recover_signer(&self) -> Result<Address, ExecutionError> {
        let sig_hash = self.signature_hash();
        let mut sig_bytes = [0u8; 64];
        sig_bytes[..32].copy_from_slice(&self.signature.r.to_be_bytes::<32>());
        sig_bytes[32..].copy_from_slice(&self.signature.s.to_be_bytes::<32>());

        let recovery_id = RecoveryId::from_i32(self.signature.odd_y_parity as i32)
            .map_err(|_| ExecutionError::SenderRecovery(self.hash))?;
        let recoverable = RecoverableSignature::from_compact(&sig_bytes, recovery_id)
            .map_err(|_| ExecutionError::SenderRecovery(self.hash))?;
        let message =
            Message::from_digest_slice(sig_hash.as_slice()).map_err(|_| ExecutionError::SenderRecovery(self.hash))?;
        let public_key = SECP256K1
            .recover_ecdsa(&message, &recoverable)
            .map_err(|_| ExecutionError::SenderRecovery(self.hash))?;

        let uncompressed = public_key.serialize_uncompressed();
        let hash = keccak256(&uncompressed[1..]);
        Ok(Address::from_slice(&hash[12..]))
    }
}

#[cfg(test)]
mod tests {
    use secp256k1::SecretKey;

    use super::*;

    fn signed_legacy(chain_id: Option<u64>) -> TransactionSigned {
        let mut tx = TransactionSigned {
            hash: TxHash::ZERO,
            index: 0,
            tx_type: TxType::Legacy,
            chain_id,
            nonce: 7,
            gas_limit: 21_000,
            to: TxKind::Call(Address::repeat_byte(0x11)),
            value: U256::from(1_000u64),
            input: Bytes::new(),
            access_list: AccessList::default(),
            gas_price: Some(10_000_000_000),
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            max_fee_per_blob_gas: None,
            blob_versioned_hashes: Vec::new(),
            signature: TxSignature { r: U256::ZERO, s: U256::ZERO, odd_y_parity: false },
        };

        let secret = SecretKey::from_slice(&[0x42; 32]).unwrap();
        let sig_hash = tx.signature_hash();
        let message = Message::from_digest_slice(sig_hash.as_slice()).unwrap();
        let (recovery_id, compact) = SECP256K1.sign_ecdsa_recoverable(&message, &secret).serialize_compact();

        tx.signature = TxSignature {
            r: U256::from_be_slice(&compact[..32]),
            s: U256::from_be_slice(&compact[32..]),
            odd_y_parity: recovery_id.to_i32() == 1,
        };
        tx.hash = sig_hash;
        tx
    }

    #[test]
    fn recovers_signer_for_eip155_legacy_tx() {
        let secret = SecretKey::from_slice(&[0x42; 32]).unwrap();
        let expected = secret.public_key(&SECP256K1);
        let uncompressed = expected.serialize_uncompressed();
        let expected_addr = Address::from_slice(&keccak256(&uncompressed[1..])[12..]);

        let tx = signed_legacy(Some(1));
        assert_eq!(tx.recover_signer().unwrap(), expected_addr);
    }

    #[test]
    fn unprotected_and_eip155_signing_hashes_differ() {
        let unprotected = signed_legacy(None);
        let protected = signed_legacy(Some(1));
        assert_ne!(unprotected.signature_hash(), protected.signature_hash());
    }

    #[test]
    fn contract_creation_encodes_empty_to_field() {
        let mut tx = signed_legacy(None);
        tx.to = TxKind::Create;
        // a creation and a call with otherwise identical fields must sign differently
        let creation_hash = tx.signature_hash();
        tx.to = TxKind::Call(Address::repeat_byte(0x11));
        let call_hash = tx.signature_hash();
        assert_ne!(creation_hash, call_hash);
    }
}
