mod args;
mod error;
mod files;
mod trace;

use crate::args::StfCli;
use crate::error::CliError;
use crate::files::{read_json, write_json};
use crate::trace::JsonLinesTracer;
use alloy_primitives::B256;
use clap::Parser as _;
use std::process::ExitCode;
use stf_evm::RevmExecutor;
use stf_transition::{ExecutionResult, Prestate, Tracer};
use stf_types::{Env, GenesisAlloc, Transaction};
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{layer::SubscriberExt as _, EnvFilter, Layer as _, Registry};

fn main() -> ExitCode {
    let subscriber = Registry::default();
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let output_layer = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_ansi(true)
        .with_file(true)
        .with_writer(std::io::stderr);

    let subscriber = subscriber
        .with(filter)
        .with(ErrorLayer::default())
        .with(output_layer.boxed());

    subscriber.init();

    if let Err(report) = color_eyre::install() {
        warn!(%report, "color eyre could not be installed");
    }

    let args = StfCli::parse();

    match run(&args) {
        Ok(result) => {
            info!(
                state_root = %result.state_root,
                receipts = result.receipts.len(),
                rejected = result.rejected.len(),
                "Transition complete"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            let code = err.exit_code();
            error!(code, "Transition failed");
            eprintln!("{:?}", eyre::Report::new(err));
            ExitCode::from(code)
        }
    }
}

/// Load the inputs named by `args`, apply the batch and write both outputs.
fn run(args: &StfCli) -> Result<ExecutionResult, CliError> {
    let chain = args.chain_config().map_err(CliError::Config)?;
    let pre: GenesisAlloc = read_json(&args.input_alloc)?;
    let env: Env = read_json(&args.input_env)?;
    let txs: Vec<Transaction> = read_json(&args.input_txs)?;
    info!(
        chain_id = chain.chain_id,
        number = env.number,
        accounts = pre.len(),
        txs = txs.len(),
        "Loaded inputs"
    );

    let basedir = &args.output_basedir;
    std::fs::create_dir_all(basedir).map_err(|source| CliError::Write {
        path: basedir.clone(),
        source,
    })?;
    let mut get_tracer = |index: u64, tx_hash: B256| -> eyre::Result<Option<Box<dyn Tracer>>> {
        if !args.trace {
            return Ok(None);
        }
        let tracer = JsonLinesTracer::create(basedir, index, tx_hash)?;
        Ok(Some(Box::new(tracer)))
    };

    let prestate = Prestate { env, pre };
    let (state, result) = prestate.apply(
        &chain,
        &mut RevmExecutor::new(),
        &txs,
        args.reward(),
        &mut get_tracer,
    )?;

    write_json(&args.alloc_path(), &state.dump())?;
    write_json(&args.result_path(), &result)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, bytes, Address, U256};
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use stf_testing_utils::{call, funded_alloc, setup_tracing_and_temp_dir, test_signer, transfer};
    use stf_transition::{MissingBlockHash, TransitionError};
    use stf_types::GenesisAccount;

    const COINBASE: Address = address!("00000000000000000000000000000000000000cb");
    const PROBE: Address = address!("000000000000000000000000000000000000b10c");

    fn write_inputs(dir: &Path, txs: &[Transaction]) {
        let mut alloc = funded_alloc(&[test_signer(0).address()], U256::from(1_000_000_000_u64));
        alloc.insert(
            PROBE,
            GenesisAccount {
                // PUSH1 0 BLOCKHASH PUSH1 0 SSTORE STOP
                code: Some(bytes!("60004060005500")),
                ..Default::default()
            },
        );
        let env = serde_json::json!({
            "currentCoinbase": COINBASE,
            "currentDifficulty": "0x20000",
            "currentGasLimit": "0x989680",
            "currentNumber": "1",
            "currentTimestamp": "1000",
        });
        write_json(&dir.join("alloc.json"), &alloc).unwrap();
        write_json(&dir.join("env.json"), &env).unwrap();
        write_json(&dir.join("txs.json"), &txs).unwrap();
    }

    fn cli(dir: &Path, extra: &[&str]) -> StfCli {
        let input = |name: &str| dir.join(name).to_string_lossy().into_owned();
        let out = dir.join("out").to_string_lossy().into_owned();
        let mut argv = vec![
            "stf".to_owned(),
            "--input.alloc".to_owned(),
            input("alloc.json"),
            "--input.env".to_owned(),
            input("env.json"),
            "--input.txs".to_owned(),
            input("txs.json"),
            "--output.basedir".to_owned(),
            out,
        ];
        argv.extend(extra.iter().map(|arg| (*arg).to_owned()));
        StfCli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_run_writes_outputs() {
        let dir = setup_tracing_and_temp_dir(None, false);
        let alice = test_signer(0);
        let bob = test_signer(1).address();
        let txs = vec![
            transfer(&alice, Some(1), 0, bob, U256::from(10_u64)),
            transfer(&alice, Some(5), 1, bob, U256::from(10_u64)),
        ];
        write_inputs(dir.path(), &txs);
        let args = cli(dir.path(), &["--trace"]);

        let result = run(&args).unwrap();

        assert_eq!(result.rejected, vec![1]);
        let written: ExecutionResult = read_json(&args.result_path()).unwrap();
        assert_eq!(written, result);
        let alloc: GenesisAlloc = read_json(&args.alloc_path()).unwrap();
        assert_eq!(alloc[&bob].balance, U256::from(10_u64));
        assert_eq!(alloc[&alice.address()].nonce, Some(1));

        // signer rejections never reach the tracer
        let traced = dir
            .path()
            .join("out")
            .join(JsonLinesTracer::file_name(0, txs[0].hash()));
        assert!(traced.exists());
        assert!(!dir
            .path()
            .join("out")
            .join(JsonLinesTracer::file_name(1, txs[1].hash()))
            .exists());
    }

    #[test]
    fn test_missing_block_hash_exit_code() {
        let dir = setup_tracing_and_temp_dir(None, false);
        let txs = vec![call(&test_signer(0), Some(1), 0, 100_000, PROBE, Default::default())];
        write_inputs(dir.path(), &txs);

        let err = run(&cli(dir.path(), &[])).unwrap_err();

        assert_matches!(
            err,
            CliError::Transition(TransitionError::MissingBlockHash(
                MissingBlockHash::NoTable { number: 0 }
            ))
        );
        assert_eq!(err.exit_code(), CliError::EXIT_MISSING_BLOCKHASH);
    }

    #[test]
    fn test_bad_transaction_hex_exit_code() {
        let dir = setup_tracing_and_temp_dir(None, false);
        write_inputs(dir.path(), &[]);
        std::fs::write(dir.path().join("txs.json"), r#"["0x1234"]"#).unwrap();

        let err = run(&cli(dir.path(), &[])).unwrap_err();

        assert_eq!(err.exit_code(), CliError::EXIT_JSON);
    }

    #[test]
    fn test_missing_input_exit_code() {
        let dir = setup_tracing_and_temp_dir(None, false);

        let err = run(&cli(dir.path(), &[])).unwrap_err();

        assert_eq!(err.exit_code(), CliError::EXIT_IO);
    }
}
