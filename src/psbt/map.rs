//! Key-value map grammar shared by the global, input and output maps.

use std::collections::HashSet;
use std::str::FromStr;

use crate::bitcoin::bip32::{ChildNumber, DerivationPath, Fingerprint};
use crate::bitcoin::secp256k1::{PublicKey, XOnlyPublicKey};
use crate::bitcoin::Script;
use crate::codec::{read_varint, Cursor};
use crate::error::ValidationError;

/// A raw PSBT key-value pair, borrowing from the PSBT buffer
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawPair<'a> {
    pub key_type: u64,
    pub key_data: &'a [u8],
    pub value: &'a [u8],
}

impl<'a> RawPair<'a> {
    /// Fails unless the key carries nothing but its type.
    pub fn expect_singleton(&self) -> Result<(), ValidationError> {
        if self.key_data.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ParserError)
        }
    }

    pub fn value_as_script(&self) -> &'a Script {
        Script::from_bytes(self.value)
    }
}

/// Reads one map up to and including its zero-length separator.
///
/// `on_pair` sees every pair in order. A key repeated byte-for-byte within
/// the map is rejected before `on_pair` sees it the second time.
pub(crate) fn read_map<'a, F>(
    cursor: &mut Cursor<'a>,
    mut on_pair: F,
) -> Result<(), ValidationError>
where
    F: FnMut(RawPair<'a>) -> Result<(), ValidationError>,
{
    let mut seen: HashSet<&'a [u8]> = HashSet::new();
    loop {
        let key = cursor.read_len_prefixed()?;
        if key.is_empty() {
            return Ok(());
        }
        let value = cursor.read_len_prefixed()?;

        if !seen.insert(key) {
            return Err(ValidationError::MultipleKeysNotExpected);
        }

        let mut key_cursor = Cursor::new(key);
        let (key_type, _) = read_varint(&mut key_cursor)?;
        let key_data = key_cursor.take(key_cursor.remaining())?;

        on_pair(RawPair {
            key_type,
            key_data,
            value,
        })?;
    }
}

/// Master key fingerprint and derivation path of a public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyOrigin {
    pub fingerprint: Fingerprint,
    pub path: DerivationPath,
}

impl KeyOrigin {
    pub(crate) fn decode(cursor: &mut Cursor<'_>) -> Result<Self, ValidationError> {
        let fingerprint = Fingerprint::from(cursor.take_array::<4>()?);
        if cursor.remaining() % 4 != 0 {
            return Err(ValidationError::ParserError);
        }
        let mut path = Vec::with_capacity(cursor.remaining() / 4);
        while !cursor.is_empty() {
            path.push(ChildNumber::from(cursor.read_u32_le()?));
        }
        Ok(KeyOrigin {
            fingerprint,
            path: DerivationPath::from(path),
        })
    }

    /// Parses the `fingerprint/path` notation, e.g. `d34db33f/84'/0'/0'/1/0`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (fingerprint, path) = s.split_once('/').unwrap_or((s, ""));
        let fingerprint = Fingerprint::from_str(fingerprint)
            .map_err(|e| format!("invalid fingerprint {}: {}", fingerprint, e))?;
        let path = if path.is_empty() {
            DerivationPath::master()
        } else {
            DerivationPath::from_str(&format!("m/{}", path))
                .map_err(|e| format!("invalid path {}: {}", path, e))?
        };
        Ok(KeyOrigin { fingerprint, path })
    }
}

impl std::fmt::Display for KeyOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fingerprint)?;
        for child in self.path.as_ref() {
            write!(f, "/{}", child)?;
        }
        Ok(())
    }
}

/// The public key a derivation entry is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedKey {
    /// `PSBT_*_BIP32_DERIVATION` entries
    Ecdsa(PublicKey),
    /// `PSBT_*_TAP_BIP32_DERIVATION` entries
    Taproot(XOnlyPublicKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDerivation {
    pub key: DerivedKey,
    pub origin: KeyOrigin,
    /// Script-path leaves the key appears in; zero for a key-path key
    pub leaf_hash_count: usize,
}

impl KeyDerivation {
    pub(crate) fn decode_bip32(pair: &RawPair<'_>) -> Result<Self, ValidationError> {
        let key = PublicKey::from_slice(pair.key_data).map_err(|_| ValidationError::ParserError)?;
        let origin = KeyOrigin::decode(&mut Cursor::new(pair.value))?;
        Ok(KeyDerivation {
            key: DerivedKey::Ecdsa(key),
            origin,
            leaf_hash_count: 0,
        })
    }

    pub(crate) fn decode_tap_bip32(pair: &RawPair<'_>) -> Result<Self, ValidationError> {
        let key =
            XOnlyPublicKey::from_slice(pair.key_data).map_err(|_| ValidationError::ParserError)?;
        let mut cursor = Cursor::new(pair.value);
        let (count, _) = read_varint(&mut cursor)?;
        let count = usize::try_from(count).map_err(|_| ValidationError::ParserError)?;
        let hashes_len = count
            .checked_mul(32)
            .ok_or(ValidationError::ParserError)?;
        cursor.take(hashes_len)?;
        let origin = KeyOrigin::decode(&mut cursor)?;
        Ok(KeyDerivation {
            key: DerivedKey::Taproot(key),
            origin,
            leaf_hash_count: count,
        })
    }
}

pub(crate) fn decode_x_only(value: &[u8]) -> Result<XOnlyPublicKey, ValidationError> {
    XOnlyPublicKey::from_slice(value).map_err(|_| ValidationError::ParserError)
}
