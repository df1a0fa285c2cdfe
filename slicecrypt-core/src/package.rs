//! Single-file container for an encrypted session.
//!
//! The layout is three length-prefixed sections, each length a big-endian
//! `u64`:
//!
//! ```text
//! +---------+-------+---------+-------+------------+----------+
//! | vid_len | video | aud_len | audio | meta_len   | metadata |
//! +---------+-------+---------+-------+------------+----------+
//! ```
//!
//! `audio` may be empty. `metadata` is the encrypted metadata document, see
//! [`Metadata::encrypt`]. Nothing may follow the metadata section.

use crate::{Error, Metadata, Result, SeedStore, reader::Reader, utils};
use std::{fmt, fs, path::Path};

/// Section of a package, in file order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Video,
    Audio,
    Metadata,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Metadata => "metadata",
        })
    }
}

/// Encrypted session artifacts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Package {
    /// Selectively encrypted Annex-B video.
    pub video: Vec<u8>,
    /// Encrypted audio track, empty when the source had none.
    pub audio: Vec<u8>,
    /// Encrypted metadata document.
    pub metadata: Vec<u8>,
}

impl Package {
    /// Serialize into the on-disk layout.
    pub fn pack(&self) -> Vec<u8> {
        let mut data =
            Vec::with_capacity(24 + self.video.len() + self.audio.len() + self.metadata.len());

        for section in [&self.video, &self.audio, &self.metadata] {
            data.extend_from_slice(&(section.len() as u64).to_be_bytes());
            data.extend_from_slice(section);
        }

        data
    }

    /// Parse the on-disk layout. Truncated sections and trailing bytes are
    /// format errors.
    pub fn unpack(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);

        let video = read_section(&mut reader, Section::Video)?;
        let audio = read_section(&mut reader, Section::Audio)?;
        let metadata = read_section(&mut reader, Section::Metadata)?;

        if reader.has_more_data() {
            return Err(Error::TrailingBytes(reader.remaining()));
        }

        Ok(Self {
            video: video.to_vec(),
            audio: audio.to_vec(),
            metadata: metadata.to_vec(),
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::unpack(&fs::read(path)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        utils::write_atomic(path, &self.pack())?;
        Ok(())
    }

    /// Assemble a package, encrypting `meta` with the session's metadata seed.
    pub fn seal(
        video: Vec<u8>,
        audio: Vec<u8>,
        meta: &Metadata,
        seeds: &SeedStore,
    ) -> Result<Self> {
        Ok(Self {
            video,
            audio,
            metadata: meta.encrypt(seeds.metadata())?,
        })
    }

    /// Decrypt the metadata section with the session's metadata seed.
    pub fn open(&self, seeds: &SeedStore) -> Result<Metadata> {
        Metadata::decrypt(&self.metadata, seeds.metadata())
    }

    pub fn has_audio(&self) -> bool {
        !self.audio.is_empty()
    }
}

fn read_section<'a>(reader: &mut Reader<'a>, section: Section) -> Result<&'a [u8]> {
    let remaining = reader.remaining();
    let declared = reader.read_u64().map_err(|_| Error::Truncated {
        section,
        declared: 8,
        remaining,
    })?;

    let remaining = reader.remaining();
    reader.read_slice(declared).map_err(|_| Error::Truncated {
        section,
        declared,
        remaining,
    })
}
