//! Wallet fixtures for the end-to-end tests.
//!
//! Everything is built and serialized with rust-bitcoin, never with the
//! validator's own codec.

#![allow(dead_code)]

use std::str::FromStr;

use psbt_validator::bitcoin::bip32::{DerivationPath, Fingerprint, Xpriv};
use psbt_validator::bitcoin::hashes::Hash;
use psbt_validator::bitcoin::psbt::Psbt;
use psbt_validator::bitcoin::secp256k1::{All, PublicKey, Secp256k1};
use psbt_validator::bitcoin::{
    absolute, transaction, Amount, CompressedPublicKey, NetworkKind, OutPoint, ScriptBuf,
    Sequence, Transaction, TxIn, TxOut, Txid, WPubkeyHash, Witness,
};
use psbt_validator::{ExtendedPrivateKey, Network};

pub const SEED: [u8; 16] = *b"psbt-validator-1";

pub struct Wallet {
    secp: Secp256k1<All>,
    master: Xpriv,
    network: Network,
}

impl Wallet {
    pub fn new(network: Network) -> Self {
        Wallet {
            secp: Secp256k1::new(),
            master: Xpriv::new_master(NetworkKind::Test, &SEED).unwrap(),
            network,
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.master.fingerprint(&self.secp)
    }

    /// A fresh copy of the master key for one validation call
    pub fn master_key(&self) -> ExtendedPrivateKey {
        ExtendedPrivateKey::from_xpriv(&self.master).unwrap()
    }

    pub fn path(&self, chain: u32, index: u32) -> DerivationPath {
        DerivationPath::from_str(&format!(
            "m/84'/{}'/0'/{}/{}",
            self.network.coin_type(),
            chain,
            index
        ))
        .unwrap()
    }

    pub fn key(&self, path: &DerivationPath) -> PublicKey {
        self.master
            .derive_priv(&self.secp, path)
            .unwrap()
            .private_key
            .public_key(&self.secp)
    }

    pub fn p2wpkh(&self, key: &PublicKey) -> ScriptBuf {
        ScriptBuf::new_p2wpkh(&CompressedPublicKey(*key).wpubkey_hash())
    }
}

pub fn foreign_script(tag: u8) -> ScriptBuf {
    ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array([tag; 20]))
}

/// Spends `inputs` P2WPKH coins of the wallet into the given outputs.
///
/// Outputs are `(value, Some((chain, index)))` for change and
/// `(value, None)` for a payment to a foreign script.
pub fn wallet_psbt(
    wallet: &Wallet,
    inputs: &[u64],
    outputs: &[(u64, Option<(u32, u32)>)],
) -> Psbt {
    let mut previous = Vec::new();
    for (i, value) in inputs.iter().enumerate() {
        let path = wallet.path(0, i as u32);
        let key = wallet.key(&path);
        let prev_tx = Transaction {
            version: transaction::Version::TWO,
            lock_time: absolute::LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::new(Txid::from_byte_array([0x40 + i as u8; 32]), 1),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: vec![TxOut {
                value: Amount::from_sat(*value),
                script_pubkey: wallet.p2wpkh(&key),
            }],
        };
        previous.push((prev_tx, key, path));
    }

    let tx = Transaction {
        version: transaction::Version::TWO,
        lock_time: absolute::LockTime::ZERO,
        input: previous
            .iter()
            .map(|(prev_tx, _, _)| TxIn {
                previous_output: OutPoint::new(prev_tx.compute_txid(), 0),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
                witness: Witness::new(),
            })
            .collect(),
        output: outputs
            .iter()
            .enumerate()
            .map(|(i, (value, change))| TxOut {
                value: Amount::from_sat(*value),
                script_pubkey: match change {
                    Some((chain, index)) => {
                        wallet.p2wpkh(&wallet.key(&wallet.path(*chain, *index)))
                    }
                    None => foreign_script(0xa0 + i as u8),
                },
            })
            .collect(),
    };

    let mut psbt = Psbt::from_unsigned_tx(tx).unwrap();
    for (input, (prev_tx, key, path)) in psbt.inputs.iter_mut().zip(previous) {
        input.witness_utxo = Some(prev_tx.output[0].clone());
        input.non_witness_utxo = Some(prev_tx);
        input.bip32_derivation.insert(key, (wallet.fingerprint(), path));
    }
    for (output, (_, change)) in psbt.outputs.iter_mut().zip(outputs) {
        if let Some((chain, index)) = change {
            let path = wallet.path(*chain, *index);
            output
                .bip32_derivation
                .insert(wallet.key(&path), (wallet.fingerprint(), path));
        }
    }
    psbt
}
