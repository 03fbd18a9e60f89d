//! Bitcoin serialization primitives.
//!
//! Leaf module with no knowledge of PSBT semantics: a bounds-checked byte
//! cursor, compact-size integers and the two checksummed address encodings.

mod base58;
mod bech32;
mod varint;

pub use base58::{base58_check_decode, base58_check_encode};
pub use bech32::{bech32_decode, bech32_decode_with_variant, bech32_encode, Bech32Variant};
pub use varint::{read_varint, varint_len, write_varint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Fewer bytes remain than the value being read needs
    TruncatedInput,
    /// A compact-size integer used a longer encoding than its value requires
    NonCanonicalVarint,
    /// Checksum mismatch or characters outside the encoding alphabet
    CorruptEncoding,
    /// An encoding was asked to carry, or decoded to, too little data
    EmptyPayload,
    /// Non-zero or over-long padding bits in a bech32 data part
    InvalidPadding,
    InvalidHrp,
    /// Witness version outside 0..=16
    InvalidVersion,
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::TruncatedInput => write!(f, "truncated input"),
            CodecError::NonCanonicalVarint => write!(f, "non-canonical compact size"),
            CodecError::CorruptEncoding => write!(f, "corrupt encoding"),
            CodecError::EmptyPayload => write!(f, "empty payload"),
            CodecError::InvalidPadding => write!(f, "invalid padding"),
            CodecError::InvalidHrp => write!(f, "invalid human-readable part"),
            CodecError::InvalidVersion => write!(f, "invalid witness version"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Forward-only reader over a borrowed byte slice.
///
/// Every read is bounds-checked and returns [`CodecError::TruncatedInput`]
/// instead of panicking. Slices handed out borrow from the underlying buffer.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::TruncatedInput);
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.buf[start..start + n])
    }

    pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    /// Reads a compact-size length followed by that many bytes.
    pub fn read_len_prefixed(&mut self) -> Result<&'a [u8], CodecError> {
        let (len, _) = read_varint(self)?;
        let len = usize::try_from(len).map_err(|_| CodecError::TruncatedInput)?;
        self.take(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_reads_little_endian() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let mut cursor = Cursor::new(&bytes);
        assert_eq!(cursor.read_u8(), Ok(0x01));
        assert_eq!(cursor.read_u16_le(), Ok(0x0302));
        assert_eq!(cursor.read_u32_le(), Ok(0x07060504));
        assert!(cursor.is_empty());
        assert_eq!(cursor.read_u8(), Err(CodecError::TruncatedInput));
    }

    #[test]
    fn test_take_does_not_advance_on_failure() {
        let bytes = [0xaa, 0xbb];
        let mut cursor = Cursor::new(&bytes);
        assert_eq!(cursor.take(3), Err(CodecError::TruncatedInput));
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.take(2), Ok(&bytes[..]));
    }

    #[test]
    fn test_len_prefixed() {
        let bytes = [0x02, 0xde, 0xad, 0xbe];
        let mut cursor = Cursor::new(&bytes);
        assert_eq!(cursor.read_len_prefixed(), Ok(&[0xde, 0xad][..]));
        assert_eq!(cursor.remaining(), 1);

        let short = [0x05, 0x00];
        assert_eq!(
            Cursor::new(&short).read_len_prefixed(),
            Err(CodecError::TruncatedInput)
        );
    }
}
