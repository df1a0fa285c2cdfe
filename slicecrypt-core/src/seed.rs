//! Seed generation and persistence.
//!
//! Seeds are the only secret of the scheme. They are stored as url-safe base64
//! without padding and used verbatim as text during key derivation, so a seed
//! file must be loaded exactly as it was written.

use crate::{Error, Result, utils};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Raw bytes of entropy behind a generated seed.
pub const SEED_LEN: usize = 32;
/// Seeds needed by one session: video/audio and metadata.
pub const SESSION_SEEDS: usize = 2;

/// Url-safe base64 text of at least [`SEED_LEN`] random bytes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Seed(String);

impl Seed {
    /// Validate and wrap persisted seed text.
    pub fn new<T: Into<String>>(text: T) -> Result<Self> {
        let text = text.into();
        let raw = URL_SAFE_NO_PAD
            .decode(text.trim_end_matches('='))
            .map_err(|x| Error::InvalidSeed(x.to_string()))?;

        if raw.len() < SEED_LEN {
            return Err(Error::InvalidSeed(format!(
                "expected at least {} bytes of entropy, got {}",
                SEED_LEN,
                raw.len()
            )));
        }

        Ok(Self(text))
    }

    /// Fresh seed from the operating system's random number generator.
    pub fn generate() -> Self {
        let mut raw = [0u8; SEED_LEN];
        OsRng.fill_bytes(&mut raw);
        Self(URL_SAFE_NO_PAD.encode(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Seed {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Seed> for String {
    fn from(value: Seed) -> Self {
        value.0
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Seed(..)")
    }
}

/// Ordered list of seeds as persisted in a `{"seeds": [...]}` json file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedStore {
    seeds: Vec<Seed>,
}

impl SeedStore {
    /// Wrap seeds loaded elsewhere. At least [`SESSION_SEEDS`] are required.
    pub fn new(seeds: Vec<Seed>) -> Result<Self> {
        let store = Self { seeds };
        store.check()?;
        Ok(store)
    }

    /// Generate `count` independent seeds, never fewer than [`SESSION_SEEDS`].
    pub fn generate(count: usize) -> Self {
        Self {
            seeds: (0..count.max(SESSION_SEEDS))
                .map(|_| Seed::generate())
                .collect(),
        }
    }

    pub fn seeds(&self) -> &[Seed] {
        &self.seeds
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let store = serde_json::from_str::<Self>(data)?;
        store.check()?;
        Ok(store)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Write the seed file atomically. A half written seed file would make
    /// every artifact encrypted with it unrecoverable.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        utils::write_atomic(path, self.to_json()?.as_bytes())?;
        Ok(())
    }

    /// Seed for slice and audio keys.
    pub fn video(&self) -> &Seed {
        &self.seeds[0]
    }

    /// Seed for the metadata key.
    pub fn metadata(&self) -> &Seed {
        &self.seeds[1]
    }

    fn check(&self) -> Result<()> {
        if self.seeds.len() < SESSION_SEEDS {
            return Err(Error::NotEnoughSeeds {
                required: SESSION_SEEDS,
                found: self.seeds.len(),
            });
        }

        Ok(())
    }
}
