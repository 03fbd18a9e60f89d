use bech32::primitives::decode::CheckedHrpstring;
use bech32::primitives::iter::{ByteIterExt, Fe32IterExt};
use bech32::{Bech32, Bech32m, Fe32, Hrp};

use super::CodecError;

/// Checksum constant selector (BIP173 vs BIP350)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bech32Variant {
    Bech32,
    Bech32m,
}

impl Bech32Variant {
    /// The variant a segwit address of this witness version must use
    pub fn for_witness_version(version: u8) -> Self {
        if version == 0 {
            Bech32Variant::Bech32
        } else {
            Bech32Variant::Bech32m
        }
    }
}

/// Encodes a witness-version nibble and an 8-bit payload.
///
/// The payload is regrouped into 5-bit elements, zero-padding the last one.
pub fn bech32_encode(
    hrp: &str,
    version: u8,
    payload: &[u8],
    variant: Bech32Variant,
) -> Result<String, CodecError> {
    if payload.is_empty() {
        return Err(CodecError::EmptyPayload);
    }
    if version > 16 {
        return Err(CodecError::InvalidVersion);
    }
    let hrp = Hrp::parse(hrp).map_err(|_| CodecError::InvalidHrp)?;
    let version = Fe32::try_from(version).map_err(|_| CodecError::InvalidVersion)?;

    let fes = payload.iter().copied().bytes_to_fes();
    let encoded = match variant {
        Bech32Variant::Bech32 => fes
            .with_checksum::<Bech32>(&hrp)
            .with_witness_version(version)
            .chars()
            .collect(),
        Bech32Variant::Bech32m => fes
            .with_checksum::<Bech32m>(&hrp)
            .with_witness_version(version)
            .chars()
            .collect(),
    };
    Ok(encoded)
}

/// Decodes a bech32 or bech32m string into `(hrp, version, payload)`.
pub fn bech32_decode(s: &str) -> Result<(String, u8, Vec<u8>), CodecError> {
    let (_, hrp, version, payload) = bech32_decode_with_variant(s)?;
    Ok((hrp, version, payload))
}

/// Like [`bech32_decode`] but also reports which checksum verified.
pub fn bech32_decode_with_variant(
    s: &str,
) -> Result<(Bech32Variant, String, u8, Vec<u8>), CodecError> {
    let (variant, checked) = match CheckedHrpstring::new::<Bech32>(s) {
        Ok(checked) => (Bech32Variant::Bech32, checked),
        Err(_) => match CheckedHrpstring::new::<Bech32m>(s) {
            Ok(checked) => (Bech32Variant::Bech32m, checked),
            Err(_) => return Err(CodecError::CorruptEncoding),
        },
    };

    let elements = checked
        .data_part_ascii_no_checksum()
        .iter()
        .map(|c| Fe32::from_char(c.to_ascii_lowercase() as char).map(|fe| fe.to_u8()))
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|_| CodecError::CorruptEncoding)?;

    if elements.len() < 2 {
        return Err(CodecError::EmptyPayload);
    }
    let version = elements[0];
    if version > 16 {
        return Err(CodecError::InvalidVersion);
    }
    let payload = regroup_strict(&elements[1..])?;

    Ok((variant, checked.hrp().to_lowercase(), version, payload))
}

// 5-bit to 8-bit without padding: at most 4 leftover bits, all zero
fn regroup_strict(elements: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut out = Vec::with_capacity(elements.len() * 5 / 8);
    for &fe in elements {
        acc = (acc << 5) | u32::from(fe);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
        acc &= (1 << bits) - 1;
    }
    if bits >= 5 || acc != 0 {
        return Err(CodecError::InvalidPadding);
    }
    Ok(out)
}
