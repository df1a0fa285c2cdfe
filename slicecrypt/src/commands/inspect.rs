use anyhow::{Context, Result};
use clap::Args;
use slicecrypt_core::nal;
use std::{fs, path::PathBuf};

/// List the NAL units of a h264 Annex-B stream.
#[derive(Debug, Clone, Args)]
pub struct Inspect {
    /// h264 Annex-B stream (.h264, .264).
    #[arg(required = true)]
    pub input: PathBuf,
}

impl Inspect {
    pub fn execute(self) -> Result<()> {
        super::require_file(&self.input)?;
        let data = fs::read(&self.input)
            .with_context(|| format!("failed to read {}", self.input.display()))?;
        print!("{}", report(&data));
        Ok(())
    }
}

/// Unit listing followed by the parameter sets in hex.
fn report(data: &[u8]) -> String {
    let mut lines = Vec::new();
    let mut parameter_sets = Vec::new();

    for (i, unit) in nal::units(data).enumerate() {
        match unit.nal_type() {
            Some(nal_type) => {
                lines.push(format!("NAL {:>4}: {} ({} bytes)", i, nal_type, unit.len()));

                if nal_type.is_parameter_set() {
                    parameter_sets.push(format!(
                        "{}: {}",
                        nal_type,
                        hex::encode(&unit.as_bytes()[unit.start_code_len()..])
                    ));
                }
            }
            None => lines.push(format!("NAL {:>4}: empty ({} bytes)", i, unit.len())),
        }
    }

    lines.push(format!("Total NAL units: {}", lines.len()));
    lines.extend(parameter_sets);
    lines.iter().map(|x| format!("{}\n", x)).collect()
}
