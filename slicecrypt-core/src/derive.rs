//! Deterministic key and nonce derivation.
//!
//! Every cipher invocation is keyed by a `(seed, index)` pair. Both sides only
//! need the seed and the shared index assignment, there is no key table.
//!
//! | Index | Used for |
//! |-------|----------|
//! | `-2` | encrypted metadata ([`METADATA_INDEX`]) |
//! | `-1` | audio track ([`AUDIO_INDEX`]) |
//! | `0..` | slice units in bitstream order |

use crate::seed::Seed;
use aes::{
    Aes256,
    cipher::{KeyIvInit, StreamCipher, generic_array::GenericArray},
};
use sha2::{Digest, Sha256};

type Aes256Ctr = ctr::Ctr64BE<Aes256>;

/// Derivation index reserved for the package metadata.
pub const METADATA_INDEX: i64 = -2;
/// Derivation index reserved for the audio track.
pub const AUDIO_INDEX: i64 = -1;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 8;

/// Key and nonce for one cipher invocation. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    pub key: [u8; KEY_LEN],
    pub nonce: [u8; NONCE_LEN],
}

impl KeyMaterial {
    /// Derive from `seed_index` label: the key is its SHA-256 digest and the
    /// nonce the first 8 bytes of the digest of the reversed label.
    pub fn derive(seed: &Seed, index: i64) -> Self {
        let mut label = format!("{}_{}", seed.as_str(), index).into_bytes();
        let key = Sha256::digest(&label).into();

        label.reverse();
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&Sha256::digest(&label)[..NONCE_LEN]);

        Self { key, nonce }
    }

    /// XOR `data` with the AES-256-CTR keystream. The counter block is the
    /// nonce followed by a 64-bit big-endian block counter starting at zero,
    /// so applying the keystream twice restores the input.
    pub fn apply_keystream(&self, data: &mut [u8]) {
        let mut iv = [0u8; 16];
        iv[..NONCE_LEN].copy_from_slice(&self.nonce);

        let mut cipher = Aes256Ctr::new(
            GenericArray::from_slice(&self.key),
            GenericArray::from_slice(&iv),
        );
        cipher.apply_keystream(data);
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial").finish_non_exhaustive()
    }
}

/// Encrypt or decrypt a whole buffer under `(seed, index)`.
pub fn apply(seed: &Seed, index: i64, data: &[u8]) -> Vec<u8> {
    let mut data = data.to_vec();
    KeyMaterial::derive(seed, index).apply_keystream(&mut data);
    data
}
