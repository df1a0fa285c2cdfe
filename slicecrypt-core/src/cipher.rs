//! QP-gated selective slice cipher.
//!
//! Only the payloads of coded slice units (NAL types 1 and 5) whose slice is
//! part of the [`Selection`] are transformed. Start codes, header bytes and
//! every other unit are copied bit for bit. CTR keystream application is its
//! own inverse, so the same [`SelectiveCipher::apply`] call encrypts and
//! decrypts as long as both sides use the same seed and selection.
//!
//! The trailing bits of a payload, from the byte holding the stop bit
//! onwards, are copied verbatim. They carry no picture data, and keeping them
//! means a transformed unit never ends in a zero byte and always splits at the
//! same offset when it is transformed back.
//!
//! # Slice indices
//!
//! Every slice unit receives the next index in bitstream order, whether it is
//! selected or not. Degenerate units without a header byte do not count. The
//! index is both the position in the qp list and the key derivation index.
//! It is the caller's responsibility that the qp list was traced from the
//! same bitstream: a misaligned list is not detectable here and turns the
//! wrong slices into noise.
//!
//! # Parallelism
//!
//! Index assignment is a sequential pass. The per-unit cipher work that
//! follows is independent and runs on the rayon pool, output order is that of
//! the input. Streams are processed as whole buffers, so peak memory is the
//! size of the input plus the size of the output.

use crate::{
    Error, Metadata, Result, Seed,
    derive::KeyMaterial,
    nal::{self, NalUnit},
    rbsp,
};
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Set of slice indices whose payloads are transformed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    selected: Vec<bool>,
}

impl Selection {
    /// Select every slice with `qp <= threshold`.
    pub fn by_threshold(qps: &[i32], threshold: i32) -> Self {
        Self {
            selected: qps.iter().map(|&qp| qp <= threshold).collect(),
        }
    }

    /// Selection persisted as a list of indices into a qp list of `len` entries.
    pub fn from_indices(indices: &[usize], len: usize) -> Result<Self> {
        let mut selected = vec![false; len];

        for &index in indices {
            *selected
                .get_mut(index)
                .ok_or(Error::SelectionOutOfRange { index, len })? = true;
        }

        Ok(Self { selected })
    }

    /// Persisted selection if present, otherwise the replayed threshold policy.
    pub fn from_metadata(meta: &Metadata) -> Result<Self> {
        match &meta.selected {
            Some(indices) => Self::from_indices(indices, meta.qps.len()),
            None => Ok(Self::by_threshold(&meta.qps, meta.qp_threshold)),
        }
    }

    /// Indices past the end of the qp list are never selected.
    pub fn contains(&self, index: usize) -> bool {
        self.selected.get(index).copied().unwrap_or(false)
    }

    pub fn indices(&self) -> Vec<usize> {
        self.selected
            .iter()
            .enumerate()
            .filter_map(|(i, &x)| x.then_some(i))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.selected.iter().filter(|&&x| x).count()
    }
}

/// One transformed slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceRecord {
    pub nal_type: u8,
    pub qp: i32,
}

/// Result of running the cipher over a stream.
#[derive(Clone, Debug)]
pub struct Outcome {
    /// Reassembled Annex-B stream.
    pub data: Vec<u8>,
    /// Transformed slices in bitstream order.
    pub transformed: Vec<SliceRecord>,
    /// Slice units seen in the stream, selected or not.
    pub slices: usize,
}

enum Plan<'a> {
    Keep(&'a [u8]),
    Transform { unit: NalUnit<'a>, index: usize },
}

/// Selective cipher bound to a seed, a qp list and a selection over it.
pub struct SelectiveCipher<'a> {
    seed: &'a Seed,
    qps: &'a [i32],
    selection: Selection,
}

impl<'a> SelectiveCipher<'a> {
    pub fn new(seed: &'a Seed, qps: &'a [i32], selection: Selection) -> Self {
        Self {
            seed,
            qps,
            selection,
        }
    }

    /// Cipher selecting slices with `qp <= threshold`.
    pub fn with_threshold(seed: &'a Seed, qps: &'a [i32], threshold: i32) -> Self {
        Self::new(seed, qps, Selection::by_threshold(qps, threshold))
    }

    /// Cipher replaying the selection recorded in `meta`.
    pub fn from_metadata(seed: &'a Seed, meta: &'a Metadata) -> Result<Self> {
        Ok(Self::new(seed, &meta.qps, Selection::from_metadata(meta)?))
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Encrypt or decrypt the selected slices of an Annex-B stream.
    ///
    /// Bytes before the first start code are not part of any unit and are
    /// dropped from the output.
    pub fn apply(&self, stream: &[u8]) -> Outcome {
        let mut slices = 0;

        let plan = nal::units(stream)
            .map(|unit| {
                if unit.is_degenerate() || !unit.is_slice() {
                    return Plan::Keep(unit.as_bytes());
                }

                let index = slices;
                slices += 1;

                if index < self.qps.len() && self.selection.contains(index) {
                    Plan::Transform { unit, index }
                } else {
                    Plan::Keep(unit.as_bytes())
                }
            })
            .collect::<Vec<_>>();

        let parts = plan
            .par_iter()
            .map(|x| match x {
                Plan::Keep(bytes) => Cow::Borrowed(*bytes),
                Plan::Transform { unit, index } => Cow::Owned(self.transform(unit, *index)),
            })
            .collect::<Vec<_>>();

        let mut data = Vec::with_capacity(parts.iter().map(|x| x.len()).sum());
        for part in &parts {
            data.extend_from_slice(part);
        }

        let transformed = plan
            .iter()
            .filter_map(|x| match x {
                Plan::Transform { unit, index } => Some(SliceRecord {
                    nal_type: unit.nal_type().map(|x| x.0).unwrap_or_default(),
                    qp: self.qps[*index],
                }),
                Plan::Keep(_) => None,
            })
            .collect::<Vec<_>>();

        debug!(
            "transformed {} of {} slice units ({} qp entries)",
            transformed.len(),
            slices,
            self.qps.len()
        );

        Outcome {
            data,
            transformed,
            slices,
        }
    }

    fn transform(&self, unit: &NalUnit, index: usize) -> Vec<u8> {
        let escaped = unit.payload();
        let Some(offset) = rbsp::trailing_bits_offset(escaped) else {
            return unit.as_bytes().to_vec();
        };

        let mut rbsp = rbsp::strip(&escaped[..offset]);
        KeyMaterial::derive(self.seed, index as i64).apply_keystream(&mut rbsp);
        let payload = rbsp::insert_with_tail(&rbsp, &escaped[offset..]);

        let mut bytes = Vec::with_capacity(unit.prefix().len() + payload.len());
        bytes.extend_from_slice(unit.prefix());
        bytes.extend_from_slice(&payload);
        bytes
    }
}
