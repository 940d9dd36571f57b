//! Signed legacy transactions as they appear in a block body.

use alloy_consensus::{Signed, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::{Decodable2718 as _, Eip2718Error, Encodable2718 as _};
use alloy_eips::Typed2718 as _;
use alloy_primitives::{Address, Bytes, Signature, B256, U256};
use alloy_rlp::{BufMut, Encodable};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransactionDecodeError {
    #[error("invalid transaction encoding: {0}")]
    Encoding(#[from] Eip2718Error),

    #[error("unsupported transaction type {0:#x}, only legacy transactions are accepted")]
    UnsupportedType(u8),

    #[error("{0} trailing bytes after transaction")]
    TrailingBytes(usize),
}

/// An immutable signed legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction(Signed<TxLegacy>);

impl Transaction {
    pub const fn new(signed: Signed<TxLegacy>) -> Self {
        Self(signed)
    }

    pub fn hash(&self) -> B256 {
        *self.0.hash()
    }

    pub fn tx(&self) -> &TxLegacy {
        self.0.tx()
    }

    pub fn signature(&self) -> &Signature {
        self.0.signature()
    }

    pub fn nonce(&self) -> u64 {
        self.tx().nonce
    }

    pub fn gas_limit(&self) -> u64 {
        self.tx().gas_limit
    }

    pub fn gas_price(&self) -> u128 {
        self.tx().gas_price
    }

    /// Recipient, `None` for contract creation.
    pub fn to(&self) -> Option<Address> {
        self.tx().to.to().copied()
    }

    pub fn value(&self) -> U256 {
        self.tx().value
    }

    pub fn input(&self) -> &Bytes {
        &self.tx().input
    }

    /// Chain id committed to by a replay-protected signature.
    pub fn chain_id(&self) -> Option<u64> {
        self.tx().chain_id
    }

    pub const fn inner(&self) -> &Signed<TxLegacy> {
        &self.0
    }

    fn envelope(&self) -> TxEnvelope {
        TxEnvelope::Legacy(self.0.clone())
    }

    /// Canonical byte encoding, the RLP list for legacy transactions.
    pub fn encoded(&self) -> Bytes {
        self.envelope().encoded_2718().into()
    }

    /// Decode a canonical encoding. Typed envelopes are refused.
    pub fn decode(mut buf: &[u8]) -> Result<Self, TransactionDecodeError> {
        let envelope = TxEnvelope::decode_2718(&mut buf)?;
        if !buf.is_empty() {
            return Err(TransactionDecodeError::TrailingBytes(buf.len()));
        }
        match envelope {
            TxEnvelope::Legacy(signed) => Ok(Self(signed)),
            other => Err(TransactionDecodeError::UnsupportedType(other.ty())),
        }
    }
}

impl From<Signed<TxLegacy>> for Transaction {
    fn from(signed: Signed<TxLegacy>) -> Self {
        Self(signed)
    }
}

impl Encodable for Transaction {
    fn encode(&self, out: &mut dyn BufMut) {
        self.envelope().encode_2718(out);
    }

    fn length(&self) -> usize {
        self.envelope().encode_2718_len()
    }
}

/// Transactions travel as `0x`-prefixed hex of their canonical encoding.
impl Serialize for Transaction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.encoded().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Transaction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Bytes::deserialize(deserializer)?;
        Self::decode(&raw).map_err(serde::de::Error::custom)
    }
}
