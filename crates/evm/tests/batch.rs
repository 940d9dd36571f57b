use alloy_consensus::TxLegacy;
use alloy_primitives::{address, bytes, Address, BloomInput, Bytes, TxKind, B256, U256};
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use std::collections::BTreeMap;
use stf_evm::RevmExecutor;
use stf_testing_utils::{
    call, create, funded_alloc, initialize_tracing, sign, test_signer, transfer, TEST_GAS_PRICE,
};
use stf_transition::{
    no_tracer, Executor, MissingBlockHash, Prestate, TransferExecutor, TransitionError,
};
use stf_types::{ChainConfig, Env, GenesisAccount, TxStatus};

const COINBASE: Address = address!("00000000000000000000000000000000000000cb");
const PROBE: Address = address!("000000000000000000000000000000000000b10c");
const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

// copies the 11 byte logger runtime that follows it and returns it
const DEPLOY_LOGGER: Bytes = bytes!("600b600c600039600b6000f3602a60005260206000a000");
// PUSH1 0 BLOCKHASH PUSH1 0 SSTORE STOP
const STORE_BLOCKHASH: Bytes = bytes!("60004060005500");

#[fixture]
fn prestate() -> Prestate {
    initialize_tracing();
    let mut pre = funded_alloc(
        &[test_signer(0).address(), test_signer(1).address()],
        U256::from(ONE_ETHER),
    );
    pre.insert(
        PROBE,
        GenesisAccount {
            code: Some(STORE_BLOCKHASH),
            ..Default::default()
        },
    );
    Prestate {
        env: Env {
            coinbase: COINBASE,
            difficulty: U256::from(0x20000_u64),
            gas_limit: 10_000_000,
            number: 1,
            timestamp: 1_000,
            block_hashes: None,
            ommers: Vec::new(),
        },
        pre,
    }
}

#[rstest]
fn test_deploy_then_call(prestate: Prestate) {
    let (alice, bob) = (test_signer(0), test_signer(1));
    let contract = alice.address().create(0);
    let txs = vec![
        create(&alice, Some(1), 0, 200_000, DEPLOY_LOGGER),
        call(&alice, Some(1), 1, 100_000, contract, Bytes::new()),
        transfer(&bob, Some(1), 7, alice.address(), U256::from(1_u64)),
    ];

    let (state, result) = prestate
        .apply(
            &ChainConfig::all_forks(1),
            &mut RevmExecutor::new(),
            &txs,
            U256::ZERO,
            &mut no_tracer,
        )
        .unwrap();

    assert_eq!(result.rejected, vec![2]);
    assert_eq!(result.receipts.len(), 2);
    let (deploy, invoke) = (&result.receipts[0], &result.receipts[1]);
    assert_eq!(deploy.contract_address, Some(contract));
    assert_eq!(deploy.status, TxStatus::Success);
    assert_eq!(invoke.contract_address, None);
    assert_eq!(invoke.logs.len(), 1);
    assert_eq!(invoke.logs[0].address, contract);
    assert_eq!(
        invoke.cumulative_gas_used,
        deploy.gas_used + invoke.gas_used
    );
    assert!(result
        .logs_bloom
        .contains_input(BloomInput::Raw(contract.as_slice())));

    assert_eq!(state.get_code(&contract), bytes!("602a60005260206000a000"));
    assert_eq!(state.get_nonce(&alice.address()), 2);
    assert_eq!(state.get_nonce(&bob.address()), 0);
    assert_eq!(
        state.get_balance(&COINBASE),
        U256::from(invoke.cumulative_gas_used)
    );
    assert_eq!(state.root(), result.state_root);
}

#[rstest]
fn test_blockhash_without_table_aborts(prestate: Prestate) {
    let txs = vec![call(&test_signer(0), Some(1), 0, 100_000, PROBE, Bytes::new())];

    let err = prestate
        .apply(
            &ChainConfig::all_forks(1),
            &mut RevmExecutor::new(),
            &txs,
            U256::ZERO,
            &mut no_tracer,
        )
        .unwrap_err();

    assert_matches!(
        err,
        TransitionError::MissingBlockHash(MissingBlockHash::NoTable { number: 0 })
    );
}

#[rstest]
fn test_blockhash_from_table(mut prestate: Prestate) {
    let hash = B256::repeat_byte(0xab);
    prestate.env.block_hashes = Some(BTreeMap::from([(0, hash)]));
    let txs = vec![call(&test_signer(0), Some(1), 0, 100_000, PROBE, Bytes::new())];

    let (state, result) = prestate
        .apply(
            &ChainConfig::all_forks(1),
            &mut RevmExecutor::new(),
            &txs,
            U256::ZERO,
            &mut no_tracer,
        )
        .unwrap();

    assert!(result.rejected.is_empty());
    assert_eq!(
        state.get_state(&PROBE, &B256::ZERO),
        U256::from_be_bytes(hash.0)
    );
}

#[rstest]
fn test_reward_on_top_of_fees(prestate: Prestate) {
    let txs = vec![transfer(
        &test_signer(0),
        Some(1),
        0,
        test_signer(1).address(),
        U256::from(5_u64),
    )];
    let reward = U256::from(2 * ONE_ETHER);

    let (state, result) = prestate
        .apply(
            &ChainConfig::all_forks(1),
            &mut RevmExecutor::new(),
            &txs,
            reward,
            &mut no_tracer,
        )
        .unwrap();

    assert_eq!(result.receipts[0].gas_used, 21_000);
    assert_eq!(
        state.get_balance(&COINBASE),
        reward + U256::from(21_000_u64)
    );
}

#[rstest]
fn test_refused_transfer_keeps_block_gas_charged(mut prestate: Prestate) {
    prestate.env.gas_limit = 50_000;
    let (alice, bob) = (test_signer(0), test_signer(1));
    let txs = vec![
        // buys 30_000 gas, then fails the value check
        sign(
            &alice,
            TxLegacy {
                chain_id: Some(1),
                nonce: 0,
                gas_price: TEST_GAS_PRICE,
                gas_limit: 30_000,
                to: TxKind::Call(bob.address()),
                value: U256::from(2 * ONE_ETHER),
                input: Bytes::new(),
            },
        ),
        // 21_000 no longer fits in the remaining 20_000
        transfer(&bob, Some(1), 0, alice.address(), U256::from(1_u64)),
    ];

    let run = |executor: &mut dyn Executor| {
        prestate
            .apply(
                &ChainConfig::all_forks(1),
                executor,
                &txs,
                U256::ZERO,
                &mut no_tracer,
            )
            .unwrap()
    };
    let (revm_state, revm_result) = run(&mut RevmExecutor::new());
    let (transfer_state, transfer_result) = run(&mut TransferExecutor::new());

    assert_eq!(revm_result.rejected, vec![0, 1]);
    assert_eq!(transfer_result.rejected, revm_result.rejected);
    assert!(revm_result.receipts.is_empty());
    assert_eq!(revm_result.state_root, transfer_result.state_root);
    assert_eq!(
        revm_state.get_balance(&alice.address()),
        transfer_state.get_balance(&alice.address())
    );
    assert_eq!(revm_state.get_balance(&alice.address()), U256::from(ONE_ETHER));
}
