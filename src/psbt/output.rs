use crate::bitcoin::secp256k1::XOnlyPublicKey;
use crate::bitcoin::Script;
use crate::codec::Cursor;
use crate::error::ValidationError;

use super::map::{decode_x_only, read_map, KeyDerivation, RawPair};
use super::MAX_KEYS;

const PSBT_OUT_REDEEM_SCRIPT: u64 = 0x00;
const PSBT_OUT_WITNESS_SCRIPT: u64 = 0x01;
const PSBT_OUT_BIP32_DERIVATION: u64 = 0x02;
const PSBT_OUT_TAP_INTERNAL_KEY: u64 = 0x05;
const PSBT_OUT_TAP_TREE: u64 = 0x06;
const PSBT_OUT_TAP_BIP32_DERIVATION: u64 = 0x07;

/// The fields of one output map the validator looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputMap<'a> {
    pub redeem_script: Option<&'a Script>,
    pub witness_script: Option<&'a Script>,
    /// BIP32 and taproot derivation entries, at most [`MAX_KEYS`]
    pub derivations: Vec<KeyDerivation>,
    pub tap_internal_key: Option<XOnlyPublicKey>,
    pub has_tap_tree: bool,
}

impl<'a> OutputMap<'a> {
    pub(crate) fn read(cursor: &mut Cursor<'a>) -> Result<Self, ValidationError> {
        let mut output = OutputMap::default();
        read_map(cursor, |pair| output.apply(pair))?;
        Ok(output)
    }

    fn apply(&mut self, pair: RawPair<'a>) -> Result<(), ValidationError> {
        match pair.key_type {
            PSBT_OUT_REDEEM_SCRIPT => {
                pair.expect_singleton()?;
                self.redeem_script = Some(pair.value_as_script());
            }
            PSBT_OUT_WITNESS_SCRIPT => {
                pair.expect_singleton()?;
                self.witness_script = Some(pair.value_as_script());
            }
            PSBT_OUT_BIP32_DERIVATION => {
                self.push_derivation(KeyDerivation::decode_bip32(&pair)?)?;
            }
            PSBT_OUT_TAP_INTERNAL_KEY => {
                pair.expect_singleton()?;
                self.tap_internal_key = Some(decode_x_only(pair.value)?);
            }
            PSBT_OUT_TAP_TREE => {
                pair.expect_singleton()?;
                self.has_tap_tree = true;
            }
            PSBT_OUT_TAP_BIP32_DERIVATION => {
                self.push_derivation(KeyDerivation::decode_tap_bip32(&pair)?)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn push_derivation(&mut self, derivation: KeyDerivation) -> Result<(), ValidationError> {
        if self.derivations.len() >= MAX_KEYS {
            return Err(ValidationError::TooManyOutputKeys);
        }
        self.derivations.push(derivation);
        Ok(())
    }
}
