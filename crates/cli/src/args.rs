use alloy_primitives::U256;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use stf_types::ChainConfig;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "stf",
    about = "Apply a batch of signed transactions to a prestate and report the post-state"
)]
pub struct StfCli {
    /// Prestate allocation, `address -> account`
    #[arg(long = "input.alloc", value_name = "FILE", default_value = "alloc.json")]
    pub input_alloc: PathBuf,

    /// Block environment
    #[arg(long = "input.env", value_name = "FILE", default_value = "env.json")]
    pub input_env: PathBuf,

    /// Array of hex-encoded signed transactions
    #[arg(long = "input.txs", value_name = "FILE", default_value = "txs.json")]
    pub input_txs: PathBuf,

    /// Named fork schedule, ignored when `--state.fork-config` is given
    #[arg(long = "state.fork", value_enum, default_value_t = Fork::All)]
    pub fork: Fork,

    /// Chain config file, TOML or JSON
    #[arg(long = "state.fork-config", value_name = "FILE")]
    pub fork_config: Option<PathBuf>,

    /// Overrides the chain id of the selected config
    #[arg(long = "state.chainid")]
    pub chain_id: Option<u64>,

    /// Block reward in wei, a negative value disables rewards
    #[arg(long = "state.reward", default_value_t = 0, allow_negative_numbers = true)]
    pub reward: i64,

    #[arg(long = "output.basedir", value_name = "DIR", default_value = ".")]
    pub output_basedir: PathBuf,

    /// Execution result file, relative to the base dir
    #[arg(long = "output.result", value_name = "FILE", default_value = "result.json")]
    pub output_result: PathBuf,

    /// Post-state allocation file, relative to the base dir
    #[arg(long = "output.alloc", value_name = "FILE", default_value = "alloc.json")]
    pub output_alloc: PathBuf,

    /// Write a `trace-<index>-<hash>.jsonl` file per executed transaction
    #[arg(long)]
    pub trace: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Fork {
    Mainnet,
    All,
}

impl StfCli {
    pub fn chain_config(&self) -> eyre::Result<ChainConfig> {
        let mut config = match (&self.fork_config, self.fork) {
            (Some(path), _) => ChainConfig::from_path(path)?,
            (None, Fork::Mainnet) => ChainConfig::mainnet(),
            (None, Fork::All) => ChainConfig::all_forks(1),
        };
        if let Some(chain_id) = self.chain_id {
            config.chain_id = chain_id;
        }
        Ok(config)
    }

    /// Base reward per block, zero when disabled.
    pub fn reward(&self) -> U256 {
        u64::try_from(self.reward).map_or(U256::ZERO, U256::from)
    }

    pub fn result_path(&self) -> PathBuf {
        self.output_basedir.join(&self.output_result)
    }

    pub fn alloc_path(&self) -> PathBuf {
        self.output_basedir.join(&self.output_alloc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse(args: &[&str]) -> StfCli {
        StfCli::try_parse_from(std::iter::once("stf").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.input_alloc, PathBuf::from("alloc.json"));
        assert_eq!(cli.fork, Fork::All);
        assert_eq!(cli.result_path(), PathBuf::from("./result.json"));
        assert!(!cli.trace);
        assert_eq!(cli.chain_config().unwrap(), ChainConfig::all_forks(1));
    }

    #[rstest]
    #[case("0", U256::ZERO)]
    #[case("-1", U256::ZERO)]
    #[case("2000000000000000000", U256::from(2_000_000_000_000_000_000_u64))]
    fn test_reward(#[case] value: &str, #[case] expected: U256) {
        assert_eq!(parse(&["--state.reward", value]).reward(), expected);
    }

    #[test]
    fn test_preset_with_chain_id() {
        let cli = parse(&["--state.fork", "mainnet", "--state.chainid", "5"]);
        let config = cli.chain_config().unwrap();
        assert_eq!(config.chain_id, 5);
        assert_eq!(config.istanbul_block, Some(9_069_000));
    }

    #[test]
    fn test_fork_config_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.toml");
        std::fs::write(&path, "chainId = 7\nhomesteadBlock = 0\n").unwrap();

        let cli = parse(&["--state.fork", "mainnet", "--state.fork-config", path.to_str().unwrap()]);
        let config = cli.chain_config().unwrap();

        assert_eq!(config.chain_id, 7);
        assert_eq!(config.homestead_block, Some(0));
        assert_eq!(config.istanbul_block, None);
    }

    #[test]
    fn test_missing_fork_config() {
        let cli = parse(&["--state.fork-config", "/nonexistent/chain.json"]);
        assert!(cli.chain_config().is_err());
    }
}
