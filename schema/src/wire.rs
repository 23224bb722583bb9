use std::borrow::Cow;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("access of {len} bytes at offset {offset} exceeds payload of {available} bytes")]
pub struct OutOfBounds {
    pub offset:    usize,
    pub len:       usize,
    pub available: usize,
}

/// A little-endian payload meant for reading fields at fixed offsets.
///
/// Payloads shorter than the defined length are zero-filled, which is how
/// MAVLink 2 receivers treat truncated trailing bytes:
///
/// ```
/// let bb = mavgen_schema::PayloadReader::new(&[0x2a, 0x01], 4);
/// assert_eq!(bb.read_u32(0), Ok(0x012a));
/// assert!(bb.was_zero_filled());
/// ```
pub struct PayloadReader<'a> {
    data:        Cow<'a, [u8]>,
    zero_filled: bool,
}

impl<'a> PayloadReader<'a> {
    /// Wraps `data`, padding with zeros up to `defined_len` when shorter.
    pub fn new(data: &'a [u8], defined_len: usize) -> PayloadReader<'a> {
        if data.len() >= defined_len {
            PayloadReader { data: Cow::Borrowed(data), zero_filled: false }
        } else {
            let mut shadow = Vec::with_capacity(defined_len);
            shadow.extend_from_slice(data);
            shadow.resize(defined_len, 0);
            PayloadReader { data: Cow::Owned(shadow), zero_filled: true }
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True when the wrapped payload was shorter than its defined length.
    pub fn was_zero_filled(&self) -> bool {
        self.zero_filled
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn read_bytes(&self, offset: usize, len: usize) -> Result<&[u8], OutOfBounds> {
        match offset.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(&self.data[offset..end]),
            _ => Err(OutOfBounds { offset, len, available: self.data.len() }),
        }
    }

    fn read_array<const N: usize>(&self, offset: usize) -> Result<[u8; N], OutOfBounds> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(offset, N)?);
        Ok(out)
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, OutOfBounds> {
        Ok(self.read_array::<1>(offset)?[0])
    }

    pub fn read_i8(&self, offset: usize) -> Result<i8, OutOfBounds> {
        Ok(i8::from_le_bytes(self.read_array(offset)?))
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16, OutOfBounds> {
        Ok(u16::from_le_bytes(self.read_array(offset)?))
    }

    pub fn read_i16(&self, offset: usize) -> Result<i16, OutOfBounds> {
        Ok(i16::from_le_bytes(self.read_array(offset)?))
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32, OutOfBounds> {
        Ok(u32::from_le_bytes(self.read_array(offset)?))
    }

    pub fn read_i32(&self, offset: usize) -> Result<i32, OutOfBounds> {
        Ok(i32::from_le_bytes(self.read_array(offset)?))
    }

    pub fn read_u64(&self, offset: usize) -> Result<u64, OutOfBounds> {
        Ok(u64::from_le_bytes(self.read_array(offset)?))
    }

    pub fn read_i64(&self, offset: usize) -> Result<i64, OutOfBounds> {
        Ok(i64::from_le_bytes(self.read_array(offset)?))
    }

    pub fn read_f32(&self, offset: usize) -> Result<f32, OutOfBounds> {
        Ok(f32::from_le_bytes(self.read_array(offset)?))
    }

    pub fn read_f64(&self, offset: usize) -> Result<f64, OutOfBounds> {
        Ok(f64::from_le_bytes(self.read_array(offset)?))
    }
}

/// A fixed-size little-endian payload meant for writing fields at their
/// resolved offsets. Unwritten bytes stay zero.
pub struct PayloadWriter {
    data: Vec<u8>,
}

impl PayloadWriter {
    /// Creates a zeroed payload of `len` bytes.
    pub fn new(len: usize) -> PayloadWriter {
        PayloadWriter { data: vec![0; len] }
    }

    /// Consumes the writer and returns the full payload.
    pub fn data(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consumes the writer and returns the payload with trailing zero bytes
    /// removed, keeping at least `min_len` bytes (and never less than one).
    pub fn truncated(self, min_len: usize) -> Vec<u8> {
        let mut data = self.data;
        let floor = min_len.max(1).min(data.len());
        let mut end = data.len();
        while end > floor && data[end - 1] == 0 {
            end -= 1;
        }
        data.truncate(end);
        data
    }

    pub fn write_bytes(&mut self, offset: usize, value: &[u8]) -> Result<(), OutOfBounds> {
        match offset.checked_add(value.len()) {
            Some(end) if end <= self.data.len() => {
                self.data[offset..end].copy_from_slice(value);
                Ok(())
            }
            _ => Err(OutOfBounds { offset, len: value.len(), available: self.data.len() }),
        }
    }

    pub fn write_u8(&mut self, offset: usize, value: u8) -> Result<(), OutOfBounds> {
        self.write_bytes(offset, &[value])
    }

    pub fn write_i8(&mut self, offset: usize, value: i8) -> Result<(), OutOfBounds> {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_u16(&mut self, offset: usize, value: u16) -> Result<(), OutOfBounds> {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_i16(&mut self, offset: usize, value: i16) -> Result<(), OutOfBounds> {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_u32(&mut self, offset: usize, value: u32) -> Result<(), OutOfBounds> {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_i32(&mut self, offset: usize, value: i32) -> Result<(), OutOfBounds> {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_u64(&mut self, offset: usize, value: u64) -> Result<(), OutOfBounds> {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_i64(&mut self, offset: usize, value: i64) -> Result<(), OutOfBounds> {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_f32(&mut self, offset: usize, value: f32) -> Result<(), OutOfBounds> {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    pub fn write_f64(&mut self, offset: usize, value: f64) -> Result<(), OutOfBounds> {
        self.write_bytes(offset, &value.to_le_bytes())
    }
}

#[cfg(test)]
fn write_once(len: usize, cb: fn(&mut PayloadWriter) -> Result<(), OutOfBounds>) -> Vec<u8> {
    let mut bb = PayloadWriter::new(len);
    cb(&mut bb).unwrap();
    bb.data()
}

#[test]
fn write_little_endian() {
    assert_eq!(write_once(2, |bb| bb.write_u16(0, 0x0102)), [2, 1]);
    assert_eq!(write_once(4, |bb| bb.write_i32(0, -2)), [254, 255, 255, 255]);
    assert_eq!(write_once(4, |bb| bb.write_f32(0, 1.0)), [0, 0, 128, 63]);
    assert_eq!(write_once(3, |bb| bb.write_u8(2, 7)), [0, 0, 7]);
    assert_eq!(
        write_once(8, |bb| bb.write_u64(0, 0x0102030405060708)),
        [8, 7, 6, 5, 4, 3, 2, 1]
    );
}

#[test]
fn write_out_of_bounds() {
    let mut bb = PayloadWriter::new(3);
    assert_eq!(
        bb.write_u32(1, 5),
        Err(OutOfBounds { offset: 1, len: 4, available: 3 })
    );
    assert_eq!(bb.data(), [0, 0, 0]);
}

#[test]
fn truncated_keeps_floor() {
    let mut bb = PayloadWriter::new(6);
    bb.write_u8(1, 9).unwrap();
    assert_eq!(bb.truncated(0), [0, 9]);

    let bb = PayloadWriter::new(6);
    assert_eq!(bb.truncated(0), [0]);

    let mut bb = PayloadWriter::new(6);
    bb.write_u8(0, 1).unwrap();
    assert_eq!(bb.truncated(4), [1, 0, 0, 0]);
}

#[test]
fn read_little_endian() {
    let bb = PayloadReader::new(&[2, 1, 254, 255, 255, 255], 6);
    assert!(!bb.was_zero_filled());
    assert_eq!(bb.read_u16(0), Ok(0x0102));
    assert_eq!(bb.read_i32(2), Ok(-2));
    assert_eq!(bb.read_i8(2), Ok(-2));
    assert!(bb.read_u32(4).is_err());
}

#[test]
fn read_zero_fills_short_payload() {
    let bb = PayloadReader::new(&[1], 8);
    assert!(bb.was_zero_filled());
    assert_eq!(bb.len(), 8);
    assert_eq!(bb.read_u64(0), Ok(1));
}

#[test]
fn read_keeps_long_payload() {
    let bb = PayloadReader::new(&[1, 2, 3], 2);
    assert_eq!(bb.len(), 3);
    assert_eq!(bb.read_bytes(1, 2), Ok(&[2u8, 3][..]));
}
