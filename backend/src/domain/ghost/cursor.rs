//! Bounds-checked little-endian reader over a byte slice.

use crate::domain::Error;

const LOOKBACK_VERSION: u32 = 3;
const LOOKBACK_EMPTY: u32 = 0xFFFF_FFFF;
const LOOKBACK_FLAGS: u32 = 0xC000_0000;
const LOOKBACK_INDEX: u32 = 0x3FFF_FFFF;

/// Sequential reader over GBX-encoded data.
///
/// Every read checks bounds and reports truncation as an input-format error.
/// The cursor also owns the lookback-string table, which GBX scopes to one
/// decoding pass.
pub(crate) struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
    lookback_seen: bool,
    lookback_strings: Vec<String>,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            lookback_seen: false,
            lookback_strings: Vec::new(),
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
        let end = self
            .position
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                Error::input_format(format!(
                    "unexpected end of data: wanted {len} bytes at offset {}, {} available",
                    self.position,
                    self.remaining()
                ))
            })?;
        let slice = &self.data[self.position..end];
        self.position = end;
        Ok(slice)
    }

    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.position.min(self.data.len())..];
        self.position = self.data.len();
        slice
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), Error> {
        self.take(len).map(|_| ())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, Error> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, Error> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, Error> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Read a `u32` without advancing.
    pub(crate) fn peek_u32(&self) -> Option<u32> {
        let end = self.position.checked_add(4)?;
        let bytes: [u8; 4] = self.data.get(self.position..end)?.try_into().ok()?;
        Some(u32::from_le_bytes(bytes))
    }

    /// Read a `u32` used as a byte length.
    pub(crate) fn read_len(&mut self) -> Result<usize, Error> {
        let len = self.read_u32()?;
        usize::try_from(len)
            .map_err(|_| Error::input_format(format!("length {len} exceeds address space")))
    }

    /// Length-prefixed string; invalid UTF-8 is replaced, not rejected.
    pub(crate) fn read_string(&mut self) -> Result<String, Error> {
        let len = self.read_len()?;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// GBX lookback string.
    ///
    /// References to strings introduced before this cursor started decoding
    /// resolve to an empty string.
    pub(crate) fn read_lookback_string(&mut self) -> Result<String, Error> {
        if !self.lookback_seen {
            self.lookback_seen = true;
            if self.peek_u32() == Some(LOOKBACK_VERSION) {
                self.skip(4)?;
            }
        }

        let reference = self.read_u32()?;
        if reference == LOOKBACK_EMPTY {
            return Ok(String::new());
        }
        if reference & LOOKBACK_FLAGS == 0 {
            return Ok(reference.to_string());
        }

        let index = reference & LOOKBACK_INDEX;
        if index == 0 {
            let value = self.read_string()?;
            self.lookback_strings.push(value.clone());
            return Ok(value);
        }

        let slot = usize::try_from(index - 1).unwrap_or(usize::MAX);
        Ok(self
            .lookback_strings
            .get(slot)
            .cloned()
            .unwrap_or_default())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let slice = self.take(N)?;
        let mut out = [0_u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn reads_little_endian_integers() {
        let data = [0x01, 0x02, 0x78, 0x56, 0x34, 0x12, 0xFF];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_u16().expect("u16"), 0x0201);
        assert_eq!(cursor.read_u32().expect("u32"), 0x1234_5678);
        assert_eq!(cursor.read_u8().expect("u8"), 0xFF);
        assert!(cursor.is_exhausted());
    }

    #[rstest]
    fn truncation_is_an_input_format_error() {
        let mut cursor = ByteCursor::new(&[0x01, 0x02]);
        let error = cursor.read_u32().expect_err("truncated");
        assert_eq!(error.code(), crate::domain::ErrorCode::InputFormat);
    }

    #[rstest]
    fn reads_length_prefixed_strings() {
        let mut data = 5_u32.to_le_bytes().to_vec();
        data.extend_from_slice(b"hello");
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_string().expect("string"), "hello");
    }

    #[rstest]
    fn lookback_strings_resolve_back_references() {
        let mut data = Vec::new();
        data.extend_from_slice(&LOOKBACK_VERSION.to_le_bytes());
        data.extend_from_slice(&0x4000_0000_u32.to_le_bytes());
        data.extend_from_slice(&3_u32.to_le_bytes());
        data.extend_from_slice(b"A01");
        data.extend_from_slice(&0x4000_0001_u32.to_le_bytes());
        data.extend_from_slice(&LOOKBACK_EMPTY.to_le_bytes());
        data.extend_from_slice(&26_u32.to_le_bytes());

        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_lookback_string().expect("new"), "A01");
        assert_eq!(cursor.read_lookback_string().expect("back-ref"), "A01");
        assert_eq!(cursor.read_lookback_string().expect("empty"), "");
        assert_eq!(cursor.read_lookback_string().expect("numeric"), "26");
    }

    #[rstest]
    fn unknown_back_reference_is_empty() {
        let data = 0x4000_0007_u32.to_le_bytes();
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_lookback_string().expect("unresolved"), "");
    }
}
