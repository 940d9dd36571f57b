use std::path::PathBuf;
use stf_transition::TransitionError;

/// Everything that ends a run early, grouped by the exit code it maps to.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("invalid chain configuration: {0:#}")]
    Config(eyre::Report),

    #[error("failed reading {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed writing {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed parsing {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed encoding {path:?}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl CliError {
    pub const EXIT_EVM: u8 = 2;
    pub const EXIT_CONFIG: u8 = 3;
    pub const EXIT_MISSING_BLOCKHASH: u8 = 4;
    pub const EXIT_JSON: u8 = 10;
    pub const EXIT_IO: u8 = 11;

    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => Self::EXIT_CONFIG,
            Self::Read { .. } | Self::Write { .. } => Self::EXIT_IO,
            Self::Parse { .. } | Self::Encode { .. } => Self::EXIT_JSON,
            Self::Transition(TransitionError::MissingBlockHash(_)) => Self::EXIT_MISSING_BLOCKHASH,
            Self::Transition(_) => Self::EXIT_EVM,
        }
    }
}
