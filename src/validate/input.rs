use crate::address::OutputScriptType;
use crate::bitcoin::hashes::Hash;
use crate::bitcoin::secp256k1::PublicKey;
use crate::bitcoin::taproot::TapNodeHash;
use crate::bitcoin::{Amount, Script, ScriptBuf};
use crate::error::ValidationError;
use crate::keys::KeyDeriver;
use crate::psbt::{DerivedKey, InputMap, UnsignedInput};

use super::output::{claims_key, single_key_script};

const SIGHASH_DEFAULT: u32 = 0x00;
const SIGHASH_ALL: u32 = 0x01;

/// What the validator learned about one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct CheckedInput {
    pub value: Amount,
    /// At least one derivation entry re-derives from the master key
    pub signable: bool,
}

/// Resolves the output an input spends and proves it is the referenced one.
///
/// With a full previous transaction the txid is recomputed; a witness UTXO
/// alone cannot be tied to the txid, so it is only accepted for scripts whose
/// signature commits to the amount (witness programs, directly or via P2SH).
fn spent_output(
    unsigned: &UnsignedInput,
    input: &InputMap<'_>,
) -> Result<(Amount, ScriptBuf), ValidationError> {
    match (&input.non_witness_utxo, &input.witness_utxo) {
        (Some(prev_tx), witness_utxo) => {
            if prev_tx.compute_txid() != unsigned.previous_output.txid {
                return Err(ValidationError::TxidMismatch);
            }
            let prev_out = prev_tx
                .output
                .get(unsigned.previous_output.vout as usize)
                .ok_or(ValidationError::TxidMismatch)?;
            if let Some(witness_utxo) = witness_utxo {
                if witness_utxo.value != prev_out.value
                    || witness_utxo.script_pubkey != prev_out.script_pubkey.as_script()
                {
                    return Err(ValidationError::FraudulentWitnessUtxo);
                }
            }
            Ok((prev_out.value, prev_out.script_pubkey.clone()))
        }
        (None, Some(witness_utxo)) => {
            let script = witness_utxo.script_pubkey;
            let wrapped = script.is_p2sh()
                && input.redeem_script.is_some_and(Script::is_witness_program);
            let committed = script.is_witness_program() || wrapped;
            if !committed {
                return Err(ValidationError::FraudulentWitnessUtxo);
            }
            Ok((witness_utxo.value, script.to_owned()))
        }
        (None, None) => Err(ValidationError::MissingPreviousTxid),
    }
}

fn check_sighash(sighash_type: Option<u32>, spent: &Script) -> Result<(), ValidationError> {
    match sighash_type {
        None | Some(SIGHASH_ALL) => Ok(()),
        Some(SIGHASH_DEFAULT) if spent.is_p2tr() => Ok(()),
        Some(_) => Err(ValidationError::UnsupportedSighash),
    }
}

fn check_witness_script(program: &Script, input: &InputMap<'_>) -> Result<(), ValidationError> {
    let witness_script = input
        .witness_script
        .ok_or(ValidationError::MissingRedeemWitnessScript)?;
    if witness_script.to_p2wsh() != *program {
        return Err(ValidationError::InvalidWitnessScript);
    }
    Ok(())
}

/// Script-hash spends must carry the scripts that hash to what they spend.
fn check_scripts(spent: &Script, input: &InputMap<'_>) -> Result<(), ValidationError> {
    if spent.is_p2sh() {
        let redeem = input
            .redeem_script
            .ok_or(ValidationError::MissingRedeemWitnessScript)?;
        if redeem.to_p2sh() != *spent {
            return Err(ValidationError::InvalidRedeemScript);
        }
        if redeem.is_p2wsh() {
            check_witness_script(redeem, input)?;
        }
    } else if spent.is_p2wsh() {
        check_witness_script(spent, input)?;
    }
    Ok(())
}

fn reproduces(
    deriver: &KeyDeriver,
    script_type: OutputScriptType,
    key: &PublicKey,
    input: &InputMap<'_>,
    spent: &Script,
) -> bool {
    match (script_type, input.tap_merkle_root) {
        (OutputScriptType::P2tr, Some(root)) => {
            let root = TapNodeHash::from_byte_array(root);
            ScriptBuf::new_p2tr(deriver.secp(), key.x_only_public_key().0, Some(root)) == *spent
        }
        _ => single_key_script(deriver.secp(), script_type, key).as_deref() == Some(spent),
    }
}

/// Runs every per-input check and reports the spent amount.
pub(super) fn check_input(
    deriver: &KeyDeriver,
    index: usize,
    unsigned: &UnsignedInput,
    input: &InputMap<'_>,
) -> Result<CheckedInput, ValidationError> {
    let (value, spent) = spent_output(unsigned, input)?;
    check_sighash(input.sighash_type, &spent)?;
    check_scripts(&spent, input)?;

    let script_type = match OutputScriptType::classify(&spent) {
        Some(OutputScriptType::P2sh) if input.redeem_script.is_some_and(Script::is_p2wpkh) => {
            Some(OutputScriptType::P2sh)
        }
        Some(OutputScriptType::P2sh) | Some(OutputScriptType::P2wsh) | None => None,
        single => single,
    };

    let mut matched = 0usize;
    let mut reproduces_spent = false;
    for derivation in input
        .derivations
        .iter()
        .filter(|d| d.origin.fingerprint == deriver.fingerprint())
    {
        let derived = deriver.derive_public_key(&derivation.origin.path)?;
        if !claims_key(derivation, &derived) {
            log::debug!(
                "input {}: key at {} does not derive from the master key, ignoring",
                index,
                derivation.origin.path
            );
            continue;
        }
        matched += 1;
        let key_path = match derivation.key {
            DerivedKey::Ecdsa(_) => true,
            DerivedKey::Taproot(_) => derivation.leaf_hash_count == 0,
        };
        reproduces_spent |= match script_type {
            Some(script_type) if key_path => {
                reproduces(deriver, script_type, &derived, input, &spent)
            }
            _ => true,
        };
    }

    if matched > 0 && !reproduces_spent {
        // our key, but a script it does not produce
        if input.witness_utxo.is_some() {
            return Err(ValidationError::FraudulentWitnessUtxo);
        }
        log::debug!("input {}: spent script is not built from our keys", index);
        matched = 0;
    }

    Ok(CheckedInput {
        value,
        signable: matched > 0,
    })
}
