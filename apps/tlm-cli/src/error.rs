use std::path::PathBuf;
use thiserror::Error;
use tlm_sim::SimError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Simulation error: {0}")]
    Sim(#[from] SimError),

    #[error("Unknown model '{name}' (see `tlm-cli models`)")]
    UnknownModel { name: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid options file {path}: {source}")]
    Options {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to encode report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run stopped after {steps} steps")]
    Stopped { steps: u64 },
}

pub type CliResult<T> = Result<T, CliError>;
