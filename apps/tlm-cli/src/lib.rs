//! Library side of the `tlm-cli` binary: demo models, option loading and the
//! run driver.

pub mod error;
pub mod models;
pub mod run;

pub use error::{CliError, CliResult};

use std::path::Path;
use tlm_sim::SimOptions;

/// Read [`SimOptions`] from a YAML file; missing keys take their defaults.
pub fn load_options(path: &Path) -> CliResult<SimOptions> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| CliError::Options {
        path: path.to_path_buf(),
        source,
    })
}
