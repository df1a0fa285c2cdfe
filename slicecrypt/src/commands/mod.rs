mod decrypt;
mod encrypt;
mod inspect;
mod keygen;

pub use decrypt::Decrypt;
pub use encrypt::Encrypt;
pub use inspect::Inspect;
pub use keygen::Keygen;

use clap::{ColorChoice, Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;
use thiserror::Error;

/// Selectively encrypt low-QP slices of H.264 videos and reverse it.
#[derive(Debug, Clone, Parser)]
#[command(version, author = "clitic <clitic21@gmail.com>", about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// When to output colored text.
    #[arg(long, global = true, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Maximum level of log messages.
    /// Possible values: [off, error, warn, info, debug, trace]
    #[arg(long, global = true, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    Decrypt(Decrypt),
    Encrypt(Encrypt),
    Inspect(Inspect),
    Keygen(Keygen),
}

/// Invalid invocation, reported with exit code 2.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("must specify either --package or --enc-h264")]
    NoInput,

    #[error("must specify --seed-file for decryption")]
    NoSeedFile,

    #[error("--metadata is required when decrypting a raw stream")]
    NoMetadata,

    #[error("{} not found", .0.display())]
    NotFound(PathBuf),
}

pub(crate) fn require_file(path: &std::path::Path) -> Result<(), UsageError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(UsageError::NotFound(path.to_owned()))
    }
}
