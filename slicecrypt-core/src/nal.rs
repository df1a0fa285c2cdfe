//! Annex-B segmentation into NAL units.
//!
//! Units are borrowed views into the input buffer. Every unit keeps its own
//! start code so that concatenating the units in order reproduces the buffer
//! from the first start code to its end.

use std::fmt;

const START_CODE_3: [u8; 3] = [0, 0, 1];
const START_CODE_4: [u8; 4] = [0, 0, 0, 1];

/// Type of a NAL unit, taken from the low five bits of its header byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NalType(pub u8);

impl NalType {
    pub const NON_IDR_SLICE: Self = Self(1);
    pub const IDR_SLICE: Self = Self(5);
    pub const SEI: Self = Self(6);
    pub const SPS: Self = Self(7);
    pub const PPS: Self = Self(8);
    pub const ACCESS_UNIT_DELIMITER: Self = Self(9);

    pub fn from_header(header: u8) -> Self {
        Self(header & 0x1F)
    }

    /// Coded slice of a non-IDR or IDR picture.
    pub fn is_slice(&self) -> bool {
        *self == Self::NON_IDR_SLICE || *self == Self::IDR_SLICE
    }

    pub fn is_parameter_set(&self) -> bool {
        *self == Self::SPS || *self == Self::PPS
    }
}

impl fmt::Display for NalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            1 => write!(f, "Non-IDR Slice"),
            5 => write!(f, "IDR Slice (I-frame)"),
            6 => write!(f, "SEI"),
            7 => write!(f, "SPS (Seq Param Set)"),
            8 => write!(f, "PPS (Pic Param Set)"),
            9 => write!(f, "Access Unit Delimiter"),
            x => write!(f, "Unknown (type {})", x),
        }
    }
}

/// A single NAL unit including its start code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NalUnit<'a> {
    start_code_len: usize,
    bytes: &'a [u8],
}

impl<'a> NalUnit<'a> {
    /// Start code length, either 3 or 4.
    pub fn start_code_len(&self) -> usize {
        self.start_code_len
    }

    /// All bytes of the unit, start code included.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// A unit with nothing after its start code. It carries no header byte.
    pub fn is_degenerate(&self) -> bool {
        self.bytes.len() <= self.start_code_len
    }

    pub fn header(&self) -> Option<u8> {
        self.bytes.get(self.start_code_len).copied()
    }

    pub fn nal_type(&self) -> Option<NalType> {
        self.header().map(NalType::from_header)
    }

    pub fn is_slice(&self) -> bool {
        self.nal_type().is_some_and(|x| x.is_slice())
    }

    /// Start code and header byte. Empty tail for degenerate units.
    pub fn prefix(&self) -> &'a [u8] {
        &self.bytes[..(self.start_code_len + 1).min(self.bytes.len())]
    }

    /// Escaped payload following the header byte.
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[(self.start_code_len + 1).min(self.bytes.len())..]
    }
}

/// Iterator over the NAL units of an Annex-B buffer.
///
/// The iterator is cheap to clone, a clone restarts from the same position.
#[derive(Clone, Debug)]
pub struct NalUnits<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for NalUnits<'a> {
    type Item = NalUnit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.data.len() {
            let rest = &self.data[self.pos..];

            let start_code_len = if rest.starts_with(&START_CODE_4) {
                4
            } else if rest.starts_with(&START_CODE_3) {
                3
            } else {
                self.pos += 1;
                continue;
            };

            let start = self.pos;
            let body = start + start_code_len;
            let end = next_start_code(self.data, body).unwrap_or(self.data.len());
            self.pos = end;

            return Some(NalUnit {
                start_code_len,
                bytes: &self.data[start..end],
            });
        }

        None
    }
}

/// Split `data` into NAL units. Bytes before the first start code are skipped.
pub fn units(data: &[u8]) -> NalUnits<'_> {
    NalUnits { data, pos: 0 }
}

/// Offset of the nearer 3-byte or 4-byte start code at or after `from`.
fn next_start_code(data: &[u8], from: usize) -> Option<usize> {
    let haystack = data.get(from..)?;
    let x = find(haystack, &START_CODE_3)?;

    // every 4-byte start code ends in a 3-byte one
    if x > 0 && haystack[x - 1] == 0 {
        Some(from + x - 1)
    } else {
        Some(from + x)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
