//! Byte-level reader and writer for the Move binary format.
//!
//! Multi-byte integers are little-endian. Lengths and indices are ULEB128,
//! and the reader only accepts the canonical (shortest) encoding so that a
//! decoded value always re-encodes to the exact same bytes.

use crate::error::{Result, StampError};

/// Forward-only reader over a byte slice.
///
/// `base` is the absolute offset of `data[0]` in the enclosing module, so
/// errors raised while reading a table slice still point at the right byte.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// Absolute offset of the next byte.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Build a format error pointing at the current position.
    pub fn error(&self, reason: impl Into<String>) -> StampError {
        StampError::format(self.offset(), reason)
    }

    pub fn u8(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| self.error("unexpected end of input"))?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn u32(&mut self) -> Result<u32> {
        let bytes = self.bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(self.error(format!(
                "need {len} bytes, only {} left",
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    /// Read a canonical ULEB128 value no larger than `max`.
    pub fn uleb128(&mut self, max: u64) -> Result<u64> {
        let start = self.offset();
        let mut value: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.u8()?;
            let digit = u64::from(byte & 0x7f);
            if shift == 63 && digit > 1 {
                return Err(StampError::format(start, "ULEB128 value overflows u64"));
            }
            value |= digit << shift;
            if byte & 0x80 == 0 {
                if shift > 0 && digit == 0 {
                    return Err(StampError::format(start, "non-canonical ULEB128 encoding"));
                }
                if value > max {
                    return Err(StampError::format(
                        start,
                        format!("ULEB128 value {value} exceeds limit {max}"),
                    ));
                }
                return Ok(value);
            }
            shift += 7;
            if shift > 63 {
                return Err(StampError::format(start, "ULEB128 value overflows u64"));
            }
        }
    }

    pub fn uleb128_u16(&mut self) -> Result<u16> {
        Ok(self.uleb128(u64::from(u16::MAX))? as u16)
    }

    pub fn uleb128_u32(&mut self) -> Result<u32> {
        Ok(self.uleb128(u64::from(u32::MAX))? as u32)
    }

    /// Fail unless every byte has been consumed.
    pub fn finish(&self, what: &str) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.error(format!("{} trailing bytes after {what}", self.remaining())))
        }
    }
}

/// Append-only byte sink.
#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    pub fn uleb128(&mut self, mut v: u64) {
        while v >= 0x80 {
            self.buf.push((v as u8 & 0x7f) | 0x80);
            v >>= 7;
        }
        self.buf.push(v as u8);
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// ULEB128 encoding of `v` as a fresh vector.
pub fn uleb128_bytes(v: u64) -> Vec<u8> {
    let mut w = Writer::new();
    w.uleb128(v);
    w.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uleb128_single_byte() {
        assert_eq!(uleb128_bytes(0), vec![0x00]);
        assert_eq!(uleb128_bytes(127), vec![0x7f]);
    }

    #[test]
    fn test_uleb128_multi_byte() {
        assert_eq!(uleb128_bytes(128), vec![0x80, 0x01]);
        assert_eq!(uleb128_bytes(300), vec![0xac, 0x02]);
        assert_eq!(uleb128_bytes(u64::MAX).len(), 10);
    }

    #[test]
    fn test_read_uleb128_values() {
        let mut r = Reader::new(&[0xac, 0x02, 0x7f]);
        assert_eq!(r.uleb128(u64::MAX).unwrap(), 300);
        assert_eq!(r.uleb128(u64::MAX).unwrap(), 127);
        assert!(r.is_empty());
    }

    #[test]
    fn test_read_uleb128_max_u64() {
        let bytes = uleb128_bytes(u64::MAX);
        let mut r = Reader::new(&bytes);
        assert_eq!(r.uleb128(u64::MAX).unwrap(), u64::MAX);
    }

    #[test]
    fn test_read_uleb128_rejects_non_canonical() {
        // 0 encoded with a redundant continuation group
        let mut r = Reader::new(&[0x80, 0x00]);
        let err = r.uleb128(u64::MAX).unwrap_err();
        assert!(err.to_string().contains("non-canonical"));
    }

    #[test]
    fn test_read_uleb128_rejects_overflow() {
        let mut r = Reader::new(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02]);
        assert!(r.uleb128(u64::MAX).is_err());
    }

    #[test]
    fn test_read_uleb128_respects_limit() {
        let bytes = uleb128_bytes(70_000);
        let mut r = Reader::new(&bytes);
        assert!(r.uleb128_u16().is_err());
    }

    #[test]
    fn test_read_truncated() {
        let mut r = Reader::new(&[0x80]);
        assert!(r.uleb128(u64::MAX).is_err());

        let mut r = Reader::new(&[1, 2, 3]);
        assert!(r.u32().is_err());
    }

    #[test]
    fn test_error_offset_includes_base() {
        let mut r = Reader::with_base(&[], 40);
        match r.u8().unwrap_err() {
            StampError::Format { offset, .. } => assert_eq!(offset, 40),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_finish_reports_trailing() {
        let mut r = Reader::new(&[1, 2]);
        r.u8().unwrap();
        assert!(r.finish("table").is_err());
        r.u8().unwrap();
        assert!(r.finish("table").is_ok());
    }
}
