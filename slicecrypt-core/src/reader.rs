use std::io::{Cursor, Error, ErrorKind, Read, Result};

/// Big-endian reader over a borrowed buffer.
#[derive(Clone)]
pub struct Reader<'a> {
    inner: Cursor<&'a [u8]>,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            inner: Cursor::new(data),
        }
    }

    pub fn has_more_data(&self) -> bool {
        self.get_position() < self.get_length()
    }

    pub fn get_length(&self) -> u64 {
        self.inner.get_ref().len() as u64
    }

    pub fn get_position(&self) -> u64 {
        self.inner.position()
    }

    pub fn remaining(&self) -> u64 {
        self.get_length().saturating_sub(self.get_position())
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0; 8];
        self.inner.read_exact(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    /// Borrow the next `bytes` bytes without copying.
    pub fn read_slice(&mut self, bytes: u64) -> Result<&'a [u8]> {
        if bytes > self.remaining() {
            return Err(Error::new(
                ErrorKind::UnexpectedEof,
                "Reader reads out of buffer bounds.",
            ));
        }

        let start = self.get_position() as usize;
        let end = start + bytes as usize;
        self.inner.set_position(end as u64);
        Ok(&self.inner.get_ref()[start..end])
    }
}
