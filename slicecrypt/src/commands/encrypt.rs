use super::require_file;
use crate::{
    toolchain::{Ffmpeg, MediaToolchain},
    utils,
};
use anyhow::{Context, Result};
use clap::Args;
use log::{info, warn};
use slicecrypt_core::{
    Metadata, Package, SeedStore, SelectiveCipher, derive, seed::SESSION_SEEDS, write_atomic,
};
use std::{fs, path::PathBuf};

/// Selectively encrypt the low-QP slices of a video file.
#[derive(Debug, Clone, Args)]
pub struct Encrypt {
    /// Input video file (.mp4, .mkv, etc.) with a h264 video stream.
    #[arg(short, long, required = true)]
    pub input: PathBuf,

    /// Slices with a qp less than or equal to this value are encrypted.
    #[arg(short, long, default_value_t = 30)]
    pub threshold: i32,

    /// Directory for the generated seed file.
    /// By default output directory is used.
    #[arg(short, long)]
    pub seeds: Option<PathBuf>,

    /// Directory for output files.
    /// By default directory of input file is used.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep the intermediate encrypted .h264 and .aac files.
    #[arg(short = 'k', long)]
    pub no_cleanup: bool,
}

impl Encrypt {
    pub fn execute(self) -> Result<()> {
        require_file(&self.input)?;
        let toolchain = Ffmpeg::locate()?;
        self.execute_with(&toolchain)
    }

    pub fn execute_with<T: MediaToolchain>(self, toolchain: &T) -> Result<()> {
        require_file(&self.input)?;

        let out_dir = utils::output_dir(self.output.as_deref(), &self.input);
        let seeds_dir = self.seeds.clone().unwrap_or_else(|| out_dir.clone());
        fs::create_dir_all(&out_dir)?;
        fs::create_dir_all(&seeds_dir)?;

        let base = utils::file_stem(&self.input);
        let extension = self
            .input
            .extension()
            .map(|x| format!(".{}", x.to_string_lossy()))
            .unwrap_or_else(|| ".mp4".to_owned());

        let seed_file = seeds_dir.join(format!("{}_seeds.json", base));
        let enc_h264 = out_dir.join(format!("{}_encrypted.h264", base));
        let enc_aac = out_dir.join(format!("{}_encrypted.aac", base));
        let meta_file = out_dir.join(format!("{}_metadata.json", base));
        let package_file = out_dir.join(format!("{}.bin", base));

        let seeds = SeedStore::generate(SESSION_SEEDS);
        seeds.save(&seed_file)?;
        info!("Saved seeds to {}", seed_file.to_string_lossy());

        let qps = toolchain
            .trace_qp(&self.input)
            .context("failed to trace slice headers")?
            .into_iter()
            .map(|x| x.qp)
            .collect::<Vec<_>>();
        info!("Traced {} slice qps", qps.len());

        let audio = match toolchain.extract_audio(&self.input) {
            Ok(Some(x)) => Some(derive::apply(seeds.video(), derive::AUDIO_INDEX, &x)),
            Ok(None) => {
                info!("No audio stream found, continuing with video only");
                None
            }
            Err(e) => {
                warn!("Audio extraction failed ({:#}), continuing with video only", e);
                None
            }
        };

        let video = toolchain
            .extract_elementary(&self.input)
            .context("failed to extract h264 elementary stream")?;

        let cipher = SelectiveCipher::with_threshold(seeds.video(), &qps, self.threshold);
        let outcome = cipher.apply(&video);

        if outcome.slices != qps.len() {
            warn!(
                "Stream has {} slices but {} qps were traced, slices without a qp are left unencrypted",
                outcome.slices,
                qps.len()
            );
        }

        info!(
            "Encrypted {} of {} slices (qp <= {})",
            outcome.transformed.len(),
            outcome.slices,
            self.threshold
        );

        write_atomic(&enc_h264, &outcome.data)?;

        if let Some(audio) = &audio {
            write_atomic(&enc_aac, audio)?;
        }

        let mut meta = Metadata::new(qps.clone(), self.threshold);
        meta.extension = extension;
        meta.audio_included = audio.is_some();
        meta.selected = Some(cipher.selection().indices());
        write_atomic(&meta_file, meta.to_json_pretty()?.as_bytes())?;

        let package = Package::seal(outcome.data, audio.unwrap_or_default(), &meta, &seeds)?;
        package.save(&package_file)?;
        info!(
            "Saved package to {} ({})",
            package_file.to_string_lossy(),
            utils::format_bytes(fs::metadata(&package_file)?.len() as usize, 2)
        );

        if !self.no_cleanup {
            utils::delete_temp_files(&[enc_h264, enc_aac])?;
        }

        Ok(())
    }
}
