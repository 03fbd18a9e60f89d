//! Change detection for one output.
//!
//! An output is change only if every derivation entry carrying the master
//! fingerprint re-derives to the claimed key and the committed script is
//! rebuilt from those keys. Script-hash change must be `pk(K)` or a
//! `multi`/`sortedmulti` that includes every verified key. Anything else with
//! our fingerprint on it is an attempt to pass off a foreign script as change.

use miniscript::{Legacy, Miniscript, ScriptContext, Segwitv0, Terminal};

use crate::address::OutputScriptType;
use crate::bitcoin::bip32::{ChildNumber, DerivationPath};
use crate::bitcoin::secp256k1::{All, PublicKey, Secp256k1};
use crate::bitcoin::{CompressedPublicKey, Script, ScriptBuf, TxOut};
use crate::error::ValidationError;
use crate::keys::KeyDeriver;
use crate::networks::Network;
use crate::psbt::{DerivedKey, KeyDerivation, OutputMap};

/// What an output turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputClass {
    External,
    Change {
        /// At least one verified key sits outside `purpose'/coin'/account'/chain/index`
        non_standard_path: bool,
    },
}

/// The scriptPubKey a single key commits to under `script_type`.
///
/// Taproot uses the BIP86 key-path tweak with no script tree. `P2sh` means
/// P2SH-wrapped P2WPKH; it is the only single-key P2SH form we produce.
pub(super) fn single_key_script(
    secp: &Secp256k1<All>,
    script_type: OutputScriptType,
    key: &PublicKey,
) -> Option<ScriptBuf> {
    match script_type {
        OutputScriptType::P2pkh => Some(ScriptBuf::new_p2pkh(
            &crate::bitcoin::PublicKey::new(*key).pubkey_hash(),
        )),
        OutputScriptType::P2wpkh => Some(p2wpkh(key)),
        OutputScriptType::P2sh => Some(p2wpkh(key).to_p2sh()),
        OutputScriptType::P2tr => Some(ScriptBuf::new_p2tr(
            secp,
            key.x_only_public_key().0,
            None,
        )),
        OutputScriptType::P2wsh => None,
    }
}

fn p2wpkh(key: &PublicKey) -> ScriptBuf {
    ScriptBuf::new_p2wpkh(&CompressedPublicKey(*key).wpubkey_hash())
}

/// Whether the derivation entry claims the key we derived
pub(super) fn claims_key(derivation: &KeyDerivation, derived: &PublicKey) -> bool {
    match derivation.key {
        DerivedKey::Ecdsa(claimed) => claimed == *derived,
        DerivedKey::Taproot(claimed) => claimed == derived.x_only_public_key().0,
    }
}

/// `purpose'/coin'/account'/chain/index` with our coin type
pub(super) fn is_standard_path(path: &DerivationPath, network: Network) -> bool {
    let children: &[ChildNumber] = path.as_ref();
    match children {
        [
            ChildNumber::Hardened { index: purpose },
            ChildNumber::Hardened { index: coin },
            ChildNumber::Hardened { .. },
            ChildNumber::Normal { index: chain },
            ChildNumber::Normal { .. },
        ] => {
            matches!(purpose, 44 | 48 | 49 | 84 | 86) && *coin == network.coin_type() && *chain <= 1
        }
        _ => false,
    }
}

/// Which script rules a redeem or witness script runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ScriptRules {
    /// Bare P2SH redeem script
    Legacy,
    /// P2WSH witness script, native or P2SH-wrapped
    Segwit,
}

fn template_signers<Ctx: ScriptContext>(
    node: &Terminal<crate::bitcoin::PublicKey, Ctx>,
) -> Option<Vec<PublicKey>> {
    match node {
        Terminal::Check(inner) => match &inner.node {
            Terminal::PkK(key) => Some(vec![key.inner]),
            _ => None,
        },
        // sortedmulti compiles to the same script as multi
        Terminal::Multi(thresh) => Some(thresh.iter().map(|key| key.inner).collect()),
        _ => None,
    }
}

/// Keys that can sign for `script`, if it is `pk(K)` or `multi(k, ...)`.
///
/// Every other script, including one that merely pushes a key somewhere,
/// yields `None`.
pub(super) fn script_signers(script: &Script, rules: ScriptRules) -> Option<Vec<PublicKey>> {
    match rules {
        ScriptRules::Legacy => {
            let ms = Miniscript::<crate::bitcoin::PublicKey, Legacy>::parse(script).ok()?;
            template_signers(&ms.node)
        }
        ScriptRules::Segwit => {
            let ms = Miniscript::<crate::bitcoin::PublicKey, Segwitv0>::parse(script).ok()?;
            template_signers(&ms.node)
        }
    }
}

fn signed_by_all(script: &Script, rules: ScriptRules, keys: &[PublicKey]) -> bool {
    script_signers(script, rules).is_some_and(|signers| keys.iter().all(|k| signers.contains(k)))
}

fn check_witness_script(
    program: &Script,
    witness_script: Option<&Script>,
    keys: &[PublicKey],
) -> Result<(), ValidationError> {
    let witness_script = witness_script.ok_or(ValidationError::MissingRedeemWitnessScript)?;
    if witness_script.to_p2wsh() != *program {
        return Err(ValidationError::InvalidWitnessScript);
    }
    if !signed_by_all(witness_script, ScriptRules::Segwit, keys) {
        return Err(ValidationError::FraudulentOutputPublicKey);
    }
    Ok(())
}

/// Classifies one output as external or verified change.
///
/// # Arguments
/// * `deriver` - Master key deriver for this validation
/// * `network` - Network the standard-path check expects
/// * `tx_output` - The output as committed in the unsigned transaction
/// * `output` - The PSBT output map describing it
///
/// # Returns
/// * `Ok(OutputClass::External)` if no entry carries the master fingerprint
/// * `Ok(OutputClass::Change { .. })` if the script is proven to be ours
/// * `Err(..)` if the output claims to be ours and is not
pub(super) fn classify_output(
    deriver: &KeyDeriver,
    network: Network,
    tx_output: &TxOut,
    output: &OutputMap<'_>,
) -> Result<OutputClass, ValidationError> {
    let script = tx_output.script_pubkey.as_script();
    let script_type =
        OutputScriptType::classify(script).ok_or(ValidationError::UnknownOutputScript)?;

    let ours: Vec<&KeyDerivation> = output
        .derivations
        .iter()
        .filter(|d| d.origin.fingerprint == deriver.fingerprint())
        .collect();
    if ours.is_empty() {
        return Ok(OutputClass::External);
    }

    let wrapped_p2wpkh = script_type == OutputScriptType::P2sh
        && output.redeem_script.is_some_and(Script::is_p2wpkh);
    if (script_type.is_single_key() || wrapped_p2wpkh) && output.derivations.len() > 1 {
        return Err(ValidationError::MultipleKeysNotExpected);
    }

    let key_mismatch = if script_type == OutputScriptType::P2tr {
        ValidationError::TaprootOutputInvalidPublicKey
    } else {
        ValidationError::FraudulentOutputPublicKey
    };

    let mut verified = Vec::with_capacity(ours.len());
    let mut non_standard_path = false;
    for derivation in &ours {
        let derived = deriver.derive_public_key(&derivation.origin.path)?;
        if !claims_key(derivation, &derived) {
            return Err(key_mismatch);
        }
        non_standard_path |= !is_standard_path(&derivation.origin.path, network);
        verified.push(derived);
    }

    match script_type {
        OutputScriptType::P2pkh | OutputScriptType::P2wpkh => {
            let expected = single_key_script(deriver.secp(), script_type, &verified[0]);
            if expected.as_ref() != Some(&tx_output.script_pubkey) {
                return Err(ValidationError::FraudulentOutputPublicKey);
            }
        }
        OutputScriptType::P2tr => {
            let internal = verified[0].x_only_public_key().0;
            if output.tap_internal_key.is_some_and(|key| key != internal) {
                return Err(ValidationError::TaprootOutputInvalidPublicKey);
            }
            // script trees are not rebuilt, so the output key cannot be proven
            if output.has_tap_tree {
                return Err(ValidationError::TaprootOutputInvalidPublicKey);
            }
            let expected = single_key_script(deriver.secp(), script_type, &verified[0]);
            if expected.as_ref() != Some(&tx_output.script_pubkey) {
                return Err(ValidationError::TaprootOutputInvalidPublicKey);
            }
        }
        OutputScriptType::P2sh => {
            let redeem = output
                .redeem_script
                .ok_or(ValidationError::MissingRedeemWitnessScript)?;
            if redeem.to_p2sh() != *script {
                return Err(ValidationError::InvalidRedeemScript);
            }
            if redeem.is_p2wpkh() {
                if p2wpkh(&verified[0]) != *redeem {
                    return Err(ValidationError::FraudulentOutputPublicKey);
                }
            } else if redeem.is_p2wsh() {
                check_witness_script(redeem, output.witness_script, &verified)?;
            } else if !signed_by_all(redeem, ScriptRules::Legacy, &verified) {
                return Err(ValidationError::FraudulentOutputPublicKey);
            }
        }
        OutputScriptType::P2wsh => {
            check_witness_script(script, output.witness_script, &verified)?;
        }
    }

    Ok(OutputClass::Change { non_standard_path })
}
