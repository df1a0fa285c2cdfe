//! Command line front end of [`slicecrypt_core`].
//!
//! The commands talk to ffmpeg through the [`toolchain::MediaToolchain`]
//! trait, tests drive them with an in-memory implementation.

mod commands;
mod logger;
pub mod toolchain;
mod utils;

pub use commands::{Args, Commands, Decrypt, Encrypt, Inspect, Keygen, UsageError};
pub use logger::Logger;
