//! Selective encryption of H.264 Annex-B elementary streams.
//!
//! Only the payloads of coded slice NAL units whose quantization parameter is
//! at or below a threshold are encrypted. Everything else, parameter sets and
//! NAL headers included, stays bit-exact so the result is still a structurally
//! valid stream that decodes to visibly scrambled pictures.
//!
//! # Example
//!
//! ```
//! use slicecrypt_core::{Metadata, Package, SeedStore, SelectiveCipher};
//!
//! let seeds = SeedStore::generate(2);
//! let stream = [
//!     0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0x00, 0x1E, // sps
//!     0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84, 0x21, // idr slice
//! ];
//! let meta = Metadata::new(vec![20], 25);
//!
//! let encrypted = SelectiveCipher::with_threshold(seeds.video(), &meta.qps, 25).apply(&stream);
//! let package = Package::seal(encrypted.data, vec![], &meta, &seeds).unwrap();
//!
//! let unpacked = Package::unpack(&package.pack()).unwrap();
//! let meta = unpacked.open(&seeds).unwrap();
//! let decrypted = SelectiveCipher::from_metadata(seeds.video(), &meta)
//!     .unwrap()
//!     .apply(&unpacked.video);
//!
//! assert_eq!(decrypted.data, stream);
//! ```

pub mod cipher;
pub mod derive;
pub mod nal;
pub mod package;
pub mod rbsp;
pub mod seed;

mod error;
mod metadata;
mod reader;
mod utils;

pub use cipher::{Outcome, Selection, SelectiveCipher, SliceRecord};
pub use error::Error;
pub use metadata::Metadata;
pub use package::{Package, Section};
pub use reader::Reader;
pub use seed::{Seed, SeedStore};
pub use utils::write_atomic;

/// A `Result` alias where the `Err` case is `slicecrypt_core::Error`.
pub type Result<T> = std::result::Result<T, Error>;
