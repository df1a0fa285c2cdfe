use super::{UsageError, require_file};
use crate::{
    toolchain::{Ffmpeg, MediaToolchain},
    utils,
};
use anyhow::{Context, Result};
use clap::Args;
use log::{info, warn};
use slicecrypt_core::{
    Metadata, Outcome, Package, Seed, SeedStore, SelectiveCipher, derive, write_atomic,
};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Reverse selective encryption of a package or a raw encrypted stream.
#[derive(Debug, Clone, Args)]
pub struct Decrypt {
    /// Encrypted package (.bin) written by the encrypt command.
    #[arg(short, long)]
    pub package: Option<PathBuf>,

    /// Encrypted h264 Annex-B stream.
    /// Requires `--metadata` flag.
    #[arg(short = 'v', long)]
    pub enc_h264: Option<PathBuf>,

    /// Plaintext metadata json written next to the encrypted stream.
    #[arg(short, long)]
    pub metadata: Option<PathBuf>,

    /// Seed file written by the encrypt command.
    #[arg(short, long)]
    pub seed_file: Option<PathBuf>,

    /// Directory for output files.
    /// By default directory of input file is used.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep the intermediate decrypted .h264 and .aac files.
    #[arg(short, long)]
    pub keep_temp: bool,
}

impl Decrypt {
    pub fn execute(self) -> Result<()> {
        self.validate()?;

        if self.package.is_some() {
            self.execute_with(&Ffmpeg::locate()?)
        } else {
            let seeds = self.load_seeds()?;
            self.decrypt_streams(&seeds)
        }
    }

    pub fn execute_with<T: MediaToolchain>(self, toolchain: &T) -> Result<()> {
        let seeds = self.load_seeds()?;

        if let Some(package) = &self.package {
            self.decrypt_package(toolchain, package, &seeds)?;
        }

        self.decrypt_streams(&seeds)
    }

    fn load_seeds(&self) -> Result<SeedStore> {
        let seed_file = self.validate()?;
        SeedStore::load(seed_file)
            .with_context(|| format!("failed to load seeds from {}", seed_file.display()))
    }

    fn decrypt_streams(&self, seeds: &SeedStore) -> Result<()> {
        if let Some(enc_h264) = &self.enc_h264 {
            self.decrypt_stream(enc_h264, seeds)?;
        }

        Ok(())
    }

    /// Configuration checks reported with exit code 2.
    fn validate(&self) -> Result<&Path, UsageError> {
        let seed_file = self.seed_file.as_deref().ok_or(UsageError::NoSeedFile)?;

        if self.package.is_none() && self.enc_h264.is_none() {
            return Err(UsageError::NoInput);
        }

        require_file(seed_file)?;

        if let Some(package) = &self.package {
            require_file(package)?;
        }

        if let Some(enc_h264) = &self.enc_h264 {
            require_file(self.metadata.as_deref().ok_or(UsageError::NoMetadata)?)?;
            require_file(enc_h264)?;
        }

        Ok(seed_file)
    }

    fn decrypt_package<T: MediaToolchain>(
        &self,
        toolchain: &T,
        package_file: &Path,
        seeds: &SeedStore,
    ) -> Result<()> {
        let out_dir = utils::output_dir(self.output.as_deref(), package_file);
        fs::create_dir_all(&out_dir)?;
        let name = utils::file_stem(package_file);

        let package = Package::load(package_file)
            .with_context(|| format!("failed to read {}", package_file.display()))?;
        let meta = package
            .open(seeds)
            .context("failed to decrypt package metadata, is this the right seed file?")?;

        let out_h264 = out_dir.join(format!("{}_dec.h264", name));
        let out_aac = out_dir.join(format!("{}_decrypted.aac", name));
        let out_video = out_dir.join(format!("{}_decrypted{}", name, meta.extension));

        let outcome = decrypt_video(seeds.video(), &meta, &package.video)?;
        write_atomic(&out_h264, &outcome.data)?;

        let audio = if meta.audio_included && package.has_audio() {
            let audio = derive::apply(seeds.video(), derive::AUDIO_INDEX, &package.audio);
            write_atomic(&out_aac, &audio)?;
            Some(out_aac.as_path())
        } else {
            None
        };

        toolchain
            .mux(&out_h264, audio, &out_video)
            .with_context(|| format!("failed to mux {}", out_video.display()))?;
        info!("Decrypted video written to {}", out_video.to_string_lossy());

        if !self.keep_temp {
            utils::delete_temp_files(&[out_h264, out_aac])?;
        }

        Ok(())
    }

    fn decrypt_stream(&self, enc_h264: &Path, seeds: &SeedStore) -> Result<()> {
        let out_dir = utils::output_dir(self.output.as_deref(), enc_h264);
        fs::create_dir_all(&out_dir)?;
        let name = utils::file_stem(enc_h264);

        // presence checked in validate
        let meta_file = self.metadata.as_deref().ok_or(UsageError::NoMetadata)?;
        let meta = Metadata::from_json(&fs::read(meta_file)?)
            .with_context(|| format!("failed to parse {}", meta_file.display()))?;

        let out_h264 = out_dir.join(format!("{}_decrypted.h264", name));
        let outcome = decrypt_video(seeds.video(), &meta, &fs::read(enc_h264)?)?;
        write_atomic(&out_h264, &outcome.data)?;
        info!("Decrypted video written to {}", out_h264.to_string_lossy());

        Ok(())
    }
}

fn decrypt_video(seed: &Seed, meta: &Metadata, data: &[u8]) -> Result<Outcome> {
    let outcome = SelectiveCipher::from_metadata(seed, meta)?.apply(data);

    if outcome.slices != meta.qps.len() {
        warn!(
            "Stream has {} slices but metadata lists {} qps, output may be corrupted",
            outcome.slices,
            meta.qps.len()
        );
    }

    info!(
        "Decrypted {} of {} slices",
        outcome.transformed.len(),
        outcome.slices
    );

    Ok(outcome)
}
