//! Sender recovery and message normalisation.

use alloy_consensus::SignableTransaction as _;
use alloy_primitives::{Address, SignatureError, U256};
use std::fmt::Debug;
use stf_types::{ChainConfig, Message, Transaction};

/// Half the secp256k1 curve order. Homestead rejects signatures with a larger `s`.
pub const SECP256K1N_HALF: U256 = U256::from_limbs([
    0xdfe9_2f46_681b_20a0,
    0x5d57_6e73_57a4_501d,
    0xffff_ffff_ffff_ffff,
    0x7fff_ffff_ffff_ffff,
]);

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("invalid chain id: expected {expected:?}, got {got}")]
    InvalidChainId { expected: Option<u64>, got: u64 },

    #[error("invalid transaction v, r, s values")]
    InvalidSignature,

    #[error("sender recovery failed: {0}")]
    Recovery(#[from] SignatureError),
}

/// Turns signed transactions into execution-ready messages.
pub trait Signer: Debug {
    fn to_message(&self, tx: &Transaction) -> Result<Message, SignerError>;
}

/// Signature rules in force at a given block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainSigner {
    Frontier,
    /// Rejects malleable signatures with `s` above half the curve order
    Homestead,
    /// Replay protection, protected transactions must carry `chain_id`
    Eip155 { chain_id: u64 },
}

impl ChainSigner {
    /// The signer a block at `number` validates its transactions with.
    pub const fn for_block(config: &ChainConfig, number: u64) -> Self {
        if config.is_eip155(number) {
            Self::Eip155 {
                chain_id: config.chain_id,
            }
        } else if config.is_homestead(number) {
            Self::Homestead
        } else {
            Self::Frontier
        }
    }

    pub const fn chain_id(&self) -> Option<u64> {
        match self {
            Self::Eip155 { chain_id } => Some(*chain_id),
            Self::Frontier | Self::Homestead => None,
        }
    }

    /// Recover the sender, applying this signer's acceptance rules.
    pub fn sender(&self, tx: &Transaction) -> Result<Address, SignerError> {
        let homestead = match (self, tx.chain_id()) {
            (Self::Eip155 { chain_id }, Some(got)) if got != *chain_id => {
                return Err(SignerError::InvalidChainId {
                    expected: Some(*chain_id),
                    got,
                });
            }
            (Self::Eip155 { .. }, _) | (Self::Homestead, None) => true,
            (Self::Frontier, None) => false,
            (Self::Frontier | Self::Homestead, Some(got)) => {
                return Err(SignerError::InvalidChainId {
                    expected: None,
                    got,
                });
            }
        };

        let signature = tx.signature();
        if signature.r().is_zero()
            || signature.s().is_zero()
            || (homestead && signature.s() > SECP256K1N_HALF)
        {
            return Err(SignerError::InvalidSignature);
        }
        Ok(signature.recover_address_from_prehash(&tx.tx().signature_hash())?)
    }
}

impl Signer for ChainSigner {
    fn to_message(&self, tx: &Transaction) -> Result<Message, SignerError> {
        Ok(Message {
            from: self.sender(tx)?,
            to: tx.to(),
            nonce: tx.nonce(),
            value: tx.value(),
            gas_limit: tx.gas_limit(),
            gas_price: tx.gas_price(),
            input: tx.input().clone(),
        })
    }
}
