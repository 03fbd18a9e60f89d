//! PSBT fixtures for unit tests.
//!
//! Fixtures are serialized by rust-bitcoin's own PSBT encoder so the parser is
//! always checked against an independent implementation.

use crate::address::OutputScriptType;
use crate::bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv};
use crate::bitcoin::hashes::Hash;
use crate::bitcoin::opcodes::all::{OP_CHECKMULTISIG, OP_CHECKSIG, OP_CHECKSIGVERIFY, OP_DROP};
use crate::bitcoin::psbt::Psbt;
use crate::bitcoin::script::Builder;
use crate::bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey};
use crate::bitcoin::{
    absolute, transaction, Amount, CompressedPublicKey, NetworkKind, OutPoint, ScriptBuf,
    Sequence, Transaction, TxIn, TxOut, Txid, WPubkeyHash, Witness,
};
use crate::keys::ExtendedPrivateKey;
use crate::networks::Network;

/// Generates one `#[test]` per network, binding `$network` inside `$body`.
#[macro_export]
macro_rules! test_all_networks {
    ($name:ident, $network:ident, $body:block) => {
        pastey::paste! {
            #[test]
            fn [<$name _mainnet>]() {
                let $network = $crate::Network::Mainnet;
                $body
            }

            #[test]
            fn [<$name _testnet>]() {
                let $network = $crate::Network::Testnet;
                $body
            }
        }
    };
}

pub const TEST_SEED: [u8; 32] = [0x5e; 32];

pub fn test_master_xpriv() -> Xpriv {
    Xpriv::new_master(NetworkKind::Test, &TEST_SEED).unwrap()
}

pub fn test_master_key() -> ExtendedPrivateKey {
    ExtendedPrivateKey::from_xpriv(&test_master_xpriv()).unwrap()
}

/// Script paying somewhere the test master key has no part in
pub fn external_script() -> ScriptBuf {
    ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array([0xee; 20]))
}

/// Key with no derivation from the test master key
pub fn foreign_key(seed: u8) -> PublicKey {
    SecretKey::from_slice(&[seed; 32])
        .unwrap()
        .public_key(&Secp256k1::new())
}

/// Witness or redeem script involving `ours` and `theirs`.
///
/// `pk` and `multi` (1-of-2) let `ours` sign; `dropped` and `and` mention
/// `ours` without giving it control; `theirs` ignores it.
pub fn locking_script(shape: &str, ours: &PublicKey, theirs: &PublicKey) -> ScriptBuf {
    let builder = Builder::new();
    let builder = match shape {
        "pk" => builder.push_slice(ours.serialize()).push_opcode(OP_CHECKSIG),
        "multi" => builder
            .push_int(1)
            .push_slice(theirs.serialize())
            .push_slice(ours.serialize())
            .push_int(2)
            .push_opcode(OP_CHECKMULTISIG),
        "dropped" => builder
            .push_slice(ours.serialize())
            .push_opcode(OP_DROP)
            .push_slice(theirs.serialize())
            .push_opcode(OP_CHECKSIG),
        "and" => builder
            .push_slice(ours.serialize())
            .push_opcode(OP_CHECKSIGVERIFY)
            .push_slice(theirs.serialize())
            .push_opcode(OP_CHECKSIG),
        "theirs" => builder.push_slice(theirs.serialize()).push_opcode(OP_CHECKSIG),
        _ => unreachable!("unknown script shape {}", shape),
    };
    builder.into_script()
}

fn purpose(script_type: OutputScriptType) -> u32 {
    match script_type {
        OutputScriptType::P2pkh => 44,
        OutputScriptType::P2sh => 49,
        OutputScriptType::P2wpkh => 84,
        OutputScriptType::P2wsh => 48,
        OutputScriptType::P2tr => 86,
    }
}

pub fn standard_path(
    script_type: OutputScriptType,
    network: Network,
    chain: u32,
    index: u32,
) -> DerivationPath {
    DerivationPath::from(vec![
        ChildNumber::from_hardened_idx(purpose(script_type)).unwrap(),
        ChildNumber::from_hardened_idx(network.coin_type()).unwrap(),
        ChildNumber::from_hardened_idx(0).unwrap(),
        ChildNumber::from_normal_idx(chain).unwrap(),
        ChildNumber::from_normal_idx(index).unwrap(),
    ])
}

#[derive(Debug, Clone)]
pub enum FixtureOutput {
    External {
        value: u64,
    },
    Change {
        script_type: OutputScriptType,
        value: u64,
        chain: u32,
        index: u32,
    },
}

impl FixtureOutput {
    pub fn external(value: u64) -> Self {
        FixtureOutput::External { value }
    }

    /// `P2sh` builds P2SH-wrapped P2WPKH
    pub fn change(script_type: OutputScriptType, value: u64, chain: u32, index: u32) -> Self {
        FixtureOutput::Change {
            script_type,
            value,
            chain,
            index,
        }
    }

    pub fn change_p2wpkh(value: u64, chain: u32, index: u32) -> Self {
        Self::change(OutputScriptType::P2wpkh, value, chain, index)
    }
}

/// Builds a PSBT spending P2WPKH outputs of the test master key.
///
/// Every input gets its previous transaction, its witness UTXO and its BIP32
/// derivation; change outputs get the fields a wallet would fill in.
pub struct FixtureBuilder {
    network: Network,
    inputs: Vec<u64>,
    outputs: Vec<FixtureOutput>,
}

impl FixtureBuilder {
    pub fn new(network: Network) -> Self {
        FixtureBuilder {
            network,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn input(mut self, value: u64) -> Self {
        self.inputs.push(value);
        self
    }

    pub fn output(mut self, output: FixtureOutput) -> Self {
        self.outputs.push(output);
        self
    }

    fn derive(&self, path: &DerivationPath) -> PublicKey {
        let secp = Secp256k1::new();
        test_master_xpriv()
            .derive_priv(&secp, path)
            .unwrap()
            .private_key
            .public_key(&secp)
    }

    fn previous_tx(index: usize, value: u64, script_pubkey: ScriptBuf) -> Transaction {
        Transaction {
            version: transaction::Version::TWO,
            lock_time: absolute::LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint {
                    txid: Txid::from_byte_array([index as u8 + 1; 32]),
                    vout: 0,
                },
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: vec![TxOut {
                value: Amount::from_sat(value),
                script_pubkey,
            }],
        }
    }

    pub fn build(self) -> Psbt {
        let secp = Secp256k1::new();
        let fingerprint = test_master_xpriv().fingerprint(&secp);

        let mut previous = Vec::with_capacity(self.inputs.len());
        for (index, value) in self.inputs.iter().enumerate() {
            let path = standard_path(OutputScriptType::P2wpkh, self.network, 0, index as u32);
            let key = self.derive(&path);
            let script = ScriptBuf::new_p2wpkh(&CompressedPublicKey(key).wpubkey_hash());
            previous.push((Self::previous_tx(index, *value, script), key, path));
        }

        let tx_outputs = self
            .outputs
            .iter()
            .map(|output| match output {
                FixtureOutput::External { value } => TxOut {
                    value: Amount::from_sat(*value),
                    script_pubkey: external_script(),
                },
                FixtureOutput::Change {
                    script_type,
                    value,
                    chain,
                    index,
                } => {
                    let path = standard_path(*script_type, self.network, *chain, *index);
                    let key = self.derive(&path);
                    TxOut {
                        value: Amount::from_sat(*value),
                        script_pubkey: change_script(&secp, *script_type, &key),
                    }
                }
            })
            .collect();

        let unsigned_tx = Transaction {
            version: transaction::Version::TWO,
            lock_time: absolute::LockTime::ZERO,
            input: previous
                .iter()
                .map(|(tx, _, _)| TxIn {
                    previous_output: OutPoint {
                        txid: tx.compute_txid(),
                        vout: 0,
                    },
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
                    witness: Witness::new(),
                })
                .collect(),
            output: tx_outputs,
        };

        let mut psbt = Psbt::from_unsigned_tx(unsigned_tx).unwrap();
        for (input, (tx, key, path)) in psbt.inputs.iter_mut().zip(previous) {
            input.witness_utxo = Some(tx.output[0].clone());
            input.non_witness_utxo = Some(tx);
            input.bip32_derivation.insert(key, (fingerprint, path));
        }
        for (psbt_output, output) in psbt.outputs.iter_mut().zip(&self.outputs) {
            if let FixtureOutput::Change {
                script_type,
                chain,
                index,
                ..
            } = output
            {
                let path = standard_path(*script_type, self.network, *chain, *index);
                let key = self.derive(&path);
                match script_type {
                    OutputScriptType::P2tr => {
                        let x_only = key.x_only_public_key().0;
                        psbt_output.tap_internal_key = Some(x_only);
                        psbt_output
                            .tap_key_origins
                            .insert(x_only, (vec![], (fingerprint, path)));
                    }
                    OutputScriptType::P2sh => {
                        psbt_output.redeem_script =
                            Some(ScriptBuf::new_p2wpkh(&CompressedPublicKey(key).wpubkey_hash()));
                        psbt_output.bip32_derivation.insert(key, (fingerprint, path));
                    }
                    _ => {
                        psbt_output.bip32_derivation.insert(key, (fingerprint, path));
                    }
                }
            }
        }
        psbt
    }
}

fn change_script(
    secp: &Secp256k1<crate::bitcoin::secp256k1::All>,
    script_type: OutputScriptType,
    key: &PublicKey,
) -> ScriptBuf {
    let p2wpkh = ScriptBuf::new_p2wpkh(&CompressedPublicKey(*key).wpubkey_hash());
    match script_type {
        OutputScriptType::P2pkh => {
            ScriptBuf::new_p2pkh(&crate::bitcoin::PublicKey::new(*key).pubkey_hash())
        }
        OutputScriptType::P2wpkh => p2wpkh,
        OutputScriptType::P2sh => p2wpkh.to_p2sh(),
        OutputScriptType::P2tr => ScriptBuf::new_p2tr(secp, key.x_only_public_key().0, None),
        OutputScriptType::P2wsh => panic!("no single-key P2WSH change"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_networks_macro_is_complete() {
        const _: () = assert!(
            Network::ALL.len() == 2,
            "test_all_networks! macro is out of sync with Network::ALL"
        );
    }

    #[test]
    fn test_fixture_round_trips_through_bitcoin() {
        let psbt = FixtureBuilder::new(Network::Testnet)
            .input(10_000)
            .output(FixtureOutput::external(9_000))
            .build();
        let bytes = psbt.serialize();
        assert_eq!(Psbt::deserialize(&bytes).unwrap(), psbt);
    }
}
