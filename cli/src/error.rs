//! CLI-level error variants, composed into `eyre::Report` at the outermost
//! boundary (§7/§4.13).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("no configuration found: no --config given and no hostcfg.hcl in the current directory")]
    NoConfigurationFound,
    #[error("{0} is neither a file nor a directory")]
    ConfigNotFound(String),
    #[error("no .hcl files found in {0}")]
    NoHclFiles(String),
}
