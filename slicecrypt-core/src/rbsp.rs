//! Emulation prevention for RBSP payloads.
//!
//! Inside a NAL unit the byte pairs `00 00` may never be followed by a byte in
//! `00..=03`, otherwise a parser would see a start code. Encoders escape such
//! sequences with an `03` byte which has to be removed before the payload can
//! be treated as plain data, and inserted again afterwards. Both transforms
//! are total: they accept any byte sequence, including ciphertext.

const ESCAPE: u8 = 0x03;

/// Remove emulation prevention bytes.
///
/// An `03` following two emitted zero bytes is dropped. This exactly reverses
/// [`insert`].
pub fn strip(payload: &[u8]) -> Vec<u8> {
    let mut rbsp = Vec::with_capacity(payload.len());
    let mut zeros = 0;

    for &byte in payload {
        if zeros >= 2 && byte == ESCAPE {
            zeros = 0;
            continue;
        }

        rbsp.push(byte);
        zeros = if byte == 0 { zeros + 1 } else { 0 };
    }

    rbsp
}

/// Insert emulation prevention bytes.
pub fn insert(rbsp: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(rbsp.len() + rbsp.len() / 64);
    let mut zeros = 0;

    for &byte in rbsp {
        if zeros >= 2 && byte <= ESCAPE {
            payload.push(ESCAPE);
            zeros = 0;
        }

        payload.push(byte);
        zeros = if byte == 0 { zeros + 1 } else { 0 };
    }

    payload
}

/// Offset of the byte holding `rbsp_stop_one_bit` in an escaped payload.
///
/// This is the last non-zero byte that is not an emulation prevention byte.
/// It starts the trailing bits: the stop bit, alignment zeros and any
/// `cabac_zero_word`s. `None` when the payload has no such byte.
pub fn trailing_bits_offset(payload: &[u8]) -> Option<usize> {
    let mut offset = None;
    let mut zeros = 0;

    for (i, &byte) in payload.iter().enumerate() {
        if zeros >= 2 && byte == ESCAPE {
            zeros = 0;
            continue;
        }

        if byte != 0 {
            offset = Some(i);
        }

        zeros = if byte == 0 { zeros + 1 } else { 0 };
    }

    offset
}

/// Escape `rbsp` and append an already escaped `tail`.
///
/// `tail` must start with a non-zero byte, as returned by
/// [`trailing_bits_offset`]. An escape byte is placed in between when the
/// escaped `rbsp` ends in `00 00` and the tail starts with a byte in `01..=03`.
pub fn insert_with_tail(rbsp: &[u8], tail: &[u8]) -> Vec<u8> {
    let mut payload = insert(rbsp);
    payload.reserve(tail.len() + 1);

    if payload.ends_with(&[0, 0]) && tail.first().is_some_and(|&x| x <= ESCAPE) {
        payload.push(ESCAPE);
    }

    payload.extend_from_slice(tail);
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_escapes_start_code_patterns() {
        assert_eq!(insert(&[0, 0, 0]), [0, 0, 3, 0]);
        assert_eq!(insert(&[0, 0, 1]), [0, 0, 3, 1]);
        assert_eq!(insert(&[0, 0, 2]), [0, 0, 3, 2]);
        assert_eq!(insert(&[0, 0, 3]), [0, 0, 3, 3]);
        assert_eq!(insert(&[0, 0, 4]), [0, 0, 4]);
        assert_eq!(insert(&[0, 0, 0, 0, 0]), [0, 0, 3, 0, 0, 3, 0]);
    }

    #[test]
    fn test_strip_removes_escapes() {
        assert_eq!(strip(&[0x65, 0, 0, 3, 1, 0x80]), [0x65, 0, 0, 1, 0x80]);
        assert_eq!(strip(&[0, 0, 3, 0, 0, 3]), [0, 0, 0, 0]);
        assert_eq!(strip(&[0, 3, 0, 3]), [0, 3, 0, 3]);
    }

    #[test]
    fn test_trailing_bits_offset() {
        assert_eq!(trailing_bits_offset(&[0x88, 0x80]), Some(1));
        // final 03 is the stop byte, the one before it is an escape
        assert_eq!(trailing_bits_offset(&[0x9A, 0, 0, 3, 3]), Some(4));
        // cabac_zero_word after the stop byte
        assert_eq!(trailing_bits_offset(&[0x9C, 0x80, 0, 0, 3]), Some(1));
        assert_eq!(trailing_bits_offset(&[0, 0, 3]), None);
        assert_eq!(trailing_bits_offset(&[]), None);
    }

    #[test]
    fn test_insert_with_tail_escapes_boundary() {
        assert_eq!(insert_with_tail(&[0x9A, 0, 0], &[3]), [0x9A, 0, 0, 3, 3]);
        assert_eq!(insert_with_tail(&[0x9A, 0, 0], &[0x80]), [0x9A, 0, 0, 0x80]);
        assert_eq!(insert_with_tail(&[0, 0, 0], &[1, 0]), [0, 0, 3, 0, 1, 0]);
        assert_eq!(insert_with_tail(&[0x9A, 0], &[1]), [0x9A, 0, 1]);
    }

    #[test]
    fn test_head_and_tail_rebuild_payload() {
        let cases: [&[u8]; 5] = [
            &[0x9A, 0, 0, 3, 3],
            &[0x9C, 0xF0, 0x0D, 0, 0, 3],
            &[0x88, 0, 0, 3, 1],
            &[0, 0, 3, 0, 0x80],
            &[0x41],
        ];

        for payload in cases {
            let offset = trailing_bits_offset(payload).unwrap();
            let head = strip(&payload[..offset]);

            assert_eq!(insert_with_tail(&head, &payload[offset..]), payload);
        }
    }
}
