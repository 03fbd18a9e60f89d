use super::{CodecError, Cursor};

/// Reads a compact-size integer, returning the value and the bytes consumed.
///
/// Only the minimal encoding of each value is accepted. A PSBT is hashed and
/// signed as bytes, so two encodings of the same length must not both parse.
pub fn read_varint(cursor: &mut Cursor<'_>) -> Result<(u64, usize), CodecError> {
    let start = cursor.position();
    let tag = cursor.read_u8()?;

    let (value, minimal) = match tag {
        0x00..=0xfc => (tag as u64, true),
        0xfd => {
            let v = cursor.read_u16_le()? as u64;
            (v, v >= 0xfd)
        }
        0xfe => {
            let v = cursor.read_u32_le()? as u64;
            (v, v > 0xffff)
        }
        0xff => {
            let v = cursor.read_u64_le()?;
            (v, v > 0xffff_ffff)
        }
    };

    if !minimal {
        return Err(CodecError::NonCanonicalVarint);
    }

    Ok((value, cursor.position() - start))
}

pub fn write_varint(n: u64, out: &mut Vec<u8>) {
    match n {
        0x00..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

/// Length of the minimal encoding of `n`
pub fn varint_len(n: u64) -> usize {
    match n {
        0x00..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}
