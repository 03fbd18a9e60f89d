use crate::bitcoin::consensus::deserialize;
use crate::bitcoin::secp256k1::XOnlyPublicKey;
use crate::bitcoin::{Amount, Script, Transaction};
use crate::codec::Cursor;
use crate::error::ValidationError;

use super::map::{decode_x_only, read_map, KeyDerivation, RawPair};
use super::unsigned_tx::read_amount;

const PSBT_IN_NON_WITNESS_UTXO: u64 = 0x00;
const PSBT_IN_WITNESS_UTXO: u64 = 0x01;
const PSBT_IN_SIGHASH_TYPE: u64 = 0x03;
const PSBT_IN_REDEEM_SCRIPT: u64 = 0x04;
const PSBT_IN_WITNESS_SCRIPT: u64 = 0x05;
const PSBT_IN_BIP32_DERIVATION: u64 = 0x06;
const PSBT_IN_TAP_BIP32_DERIVATION: u64 = 0x16;
const PSBT_IN_TAP_INTERNAL_KEY: u64 = 0x17;
const PSBT_IN_TAP_MERKLE_ROOT: u64 = 0x18;

/// The previous output attached for a segwit spend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WitnessUtxo<'a> {
    pub value: Amount,
    pub script_pubkey: &'a Script,
}

/// The fields of one input map the validator looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputMap<'a> {
    pub non_witness_utxo: Option<Transaction>,
    pub witness_utxo: Option<WitnessUtxo<'a>>,
    pub sighash_type: Option<u32>,
    pub redeem_script: Option<&'a Script>,
    pub witness_script: Option<&'a Script>,
    pub derivations: Vec<KeyDerivation>,
    pub tap_internal_key: Option<XOnlyPublicKey>,
    pub tap_merkle_root: Option<[u8; 32]>,
}

impl<'a> InputMap<'a> {
    pub(crate) fn read(cursor: &mut Cursor<'a>) -> Result<Self, ValidationError> {
        let mut input = InputMap::default();
        read_map(cursor, |pair| input.apply(pair))?;
        Ok(input)
    }

    fn apply(&mut self, pair: RawPair<'a>) -> Result<(), ValidationError> {
        match pair.key_type {
            PSBT_IN_NON_WITNESS_UTXO => {
                pair.expect_singleton()?;
                let tx: Transaction =
                    deserialize(pair.value).map_err(|_| ValidationError::ParserError)?;
                self.non_witness_utxo = Some(tx);
            }
            PSBT_IN_WITNESS_UTXO => {
                pair.expect_singleton()?;
                self.witness_utxo = Some(decode_witness_utxo(pair.value)?);
            }
            PSBT_IN_SIGHASH_TYPE => {
                pair.expect_singleton()?;
                let mut cursor = Cursor::new(pair.value);
                let sighash = cursor.read_u32_le()?;
                if !cursor.is_empty() {
                    return Err(ValidationError::ParserError);
                }
                self.sighash_type = Some(sighash);
            }
            PSBT_IN_REDEEM_SCRIPT => {
                pair.expect_singleton()?;
                self.redeem_script = Some(pair.value_as_script());
            }
            PSBT_IN_WITNESS_SCRIPT => {
                pair.expect_singleton()?;
                self.witness_script = Some(pair.value_as_script());
            }
            PSBT_IN_BIP32_DERIVATION => {
                self.derivations.push(KeyDerivation::decode_bip32(&pair)?);
            }
            PSBT_IN_TAP_BIP32_DERIVATION => {
                self.derivations
                    .push(KeyDerivation::decode_tap_bip32(&pair)?);
            }
            PSBT_IN_TAP_INTERNAL_KEY => {
                pair.expect_singleton()?;
                self.tap_internal_key = Some(decode_x_only(pair.value)?);
            }
            PSBT_IN_TAP_MERKLE_ROOT => {
                pair.expect_singleton()?;
                let root: [u8; 32] = pair
                    .value
                    .try_into()
                    .map_err(|_| ValidationError::ParserError)?;
                self.tap_merkle_root = Some(root);
            }
            // signatures, finalized scripts, preimages, proprietary
            _ => {}
        }
        Ok(())
    }

    pub fn has_utxo(&self) -> bool {
        self.non_witness_utxo.is_some() || self.witness_utxo.is_some()
    }
}

fn decode_witness_utxo(value: &[u8]) -> Result<WitnessUtxo<'_>, ValidationError> {
    let mut cursor = Cursor::new(value);
    let amount = read_amount(&mut cursor)?;
    let script_pubkey = Script::from_bytes(cursor.read_len_prefixed()?);
    if !cursor.is_empty() {
        return Err(ValidationError::ParserError);
    }
    Ok(WitnessUtxo {
        value: amount,
        script_pubkey,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::write_varint;

    fn pair(key: &[u8], value: &[u8], out: &mut Vec<u8>) {
        write_varint(key.len() as u64, out);
        out.extend_from_slice(key);
        write_varint(value.len() as u64, out);
        out.extend_from_slice(value);
    }

    #[test]
    fn test_witness_utxo_and_sighash() {
        let mut value = 5000u64.to_le_bytes().to_vec();
        value.push(22);
        value.extend_from_slice(&[0x00, 0x14]);
        value.extend_from_slice(&[0x11; 20]);

        let mut bytes = Vec::new();
        pair(&[0x01], &value, &mut bytes);
        pair(&[0x03], &1u32.to_le_bytes(), &mut bytes);
        pair(&[0xfc, 0x01, 0x02], &[0xde, 0xad], &mut bytes);
        bytes.push(0x00);

        let input = InputMap::read(&mut Cursor::new(&bytes)).unwrap();
        let utxo = input.witness_utxo.unwrap();
        assert_eq!(utxo.value, Amount::from_sat(5000));
        assert!(utxo.script_pubkey.is_p2wpkh());
        assert_eq!(input.sighash_type, Some(1));
        assert!(input.has_utxo());
    }

    #[test]
    fn test_singleton_with_key_data() {
        let mut bytes = Vec::new();
        pair(&[0x03, 0x00], &1u32.to_le_bytes(), &mut bytes);
        bytes.push(0x00);
        assert_eq!(
            InputMap::read(&mut Cursor::new(&bytes)),
            Err(ValidationError::ParserError)
        );
    }

    #[test]
    fn test_malformed_values() {
        for (key, value) in [
            (&[0x03][..], &[0x01, 0x00][..]),
            (&[0x00][..], &[0x02, 0x00, 0x00][..]),
            (&[0x18][..], &[0x00; 31][..]),
            (&[0x17][..], &[0x00; 32][..]),
        ] {
            let mut bytes = Vec::new();
            pair(key, value, &mut bytes);
            bytes.push(0x00);
            assert_eq!(
                InputMap::read(&mut Cursor::new(&bytes)),
                Err(ValidationError::ParserError),
                "key {:02x?}",
                key
            );
        }
    }
}
