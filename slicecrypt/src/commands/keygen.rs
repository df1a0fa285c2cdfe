use anyhow::Result;
use clap::Args;
use log::info;
use slicecrypt_core::{SeedStore, seed::SESSION_SEEDS};
use std::path::PathBuf;

/// Generate a new seed file.
#[derive(Debug, Clone, Args)]
pub struct Keygen {
    /// Path for the seed file.
    #[arg(short, long, required = true)]
    pub output: PathBuf,

    /// Number of seeds to generate.
    #[arg(short = 'n', long, default_value_t = SESSION_SEEDS, value_parser = count_parser)]
    pub count: usize,
}

impl Keygen {
    pub fn execute(self) -> Result<()> {
        if let Some(parent) = self.output.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        SeedStore::generate(self.count).save(&self.output)?;
        info!(
            "Saved {} seeds to {}",
            self.count,
            self.output.to_string_lossy()
        );
        Ok(())
    }
}

fn count_parser(s: &str) -> Result<usize, String> {
    let count = s
        .parse::<usize>()
        .map_err(|_| format!("`{}` isn't a number", s))?;

    if count < SESSION_SEEDS {
        return Err(format!("at least {} seeds are required", SESSION_SEEDS));
    }

    Ok(count)
}
