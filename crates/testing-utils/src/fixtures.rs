//! Deterministic keys, allocations and signed transactions for tests.

use alloy_consensus::{SignableTransaction as _, TxLegacy};
use alloy_genesis::GenesisAccount;
use alloy_primitives::{Address, Bytes, TxKind, B256, U256};
use alloy_signer::SignerSync as _;
use alloy_signer_local::PrivateKeySigner;
use stf_types::{GenesisAlloc, Transaction};

/// Gas price used by the transaction helpers.
pub const TEST_GAS_PRICE: u128 = 1;

/// The `index`-th deterministic test key, the private key is `index + 1`.
pub fn test_signer(index: u8) -> PrivateKeySigner {
    let key = B256::with_last_byte(index.wrapping_add(1));
    PrivateKeySigner::from_bytes(&key).expect("small scalars are valid keys")
}

/// Addresses of the first `count` test keys.
pub fn test_addresses(count: u8) -> Vec<Address> {
    (0..count).map(|index| test_signer(index).address()).collect()
}

/// Allocation funding every address with `balance`.
pub fn funded_alloc(addresses: &[Address], balance: U256) -> GenesisAlloc {
    addresses
        .iter()
        .map(|address| {
            (
                *address,
                GenesisAccount {
                    balance,
                    ..Default::default()
                },
            )
        })
        .collect()
}

/// Sign `tx` with `signer`.
pub fn sign(signer: &PrivateKeySigner, tx: TxLegacy) -> Transaction {
    let signature = signer
        .sign_hash_sync(&tx.signature_hash())
        .expect("signing with a local key cannot fail");
    Transaction::new(tx.into_signed(signature))
}

/// Plain value transfer with the minimum gas limit.
pub fn transfer(
    signer: &PrivateKeySigner,
    chain_id: Option<u64>,
    nonce: u64,
    to: Address,
    value: U256,
) -> Transaction {
    sign(
        signer,
        TxLegacy {
            chain_id,
            nonce,
            gas_price: TEST_GAS_PRICE,
            gas_limit: 21_000,
            to: TxKind::Call(to),
            value,
            input: Bytes::new(),
        },
    )
}

/// Contract creation running `init_code`.
pub fn create(
    signer: &PrivateKeySigner,
    chain_id: Option<u64>,
    nonce: u64,
    gas_limit: u64,
    init_code: Bytes,
) -> Transaction {
    sign(
        signer,
        TxLegacy {
            chain_id,
            nonce,
            gas_price: TEST_GAS_PRICE,
            gas_limit,
            to: TxKind::Create,
            value: U256::ZERO,
            input: init_code,
        },
    )
}

/// Call into `to` with `input` and an explicit gas limit.
pub fn call(
    signer: &PrivateKeySigner,
    chain_id: Option<u64>,
    nonce: u64,
    gas_limit: u64,
    to: Address,
    input: Bytes,
) -> Transaction {
    sign(
        signer,
        TxLegacy {
            chain_id,
            nonce,
            gas_price: TEST_GAS_PRICE,
            gas_limit,
            to: TxKind::Call(to),
            value: U256::ZERO,
            input,
        },
    )
}
