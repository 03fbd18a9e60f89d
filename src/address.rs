//! Output script templates and their address encodings.
//!
//! Addresses are produced with the crate's own Base58Check and bech32 codecs.

use crate::bitcoin::opcodes::all::{OP_CHECKSIG, OP_DUP, OP_EQUAL, OP_EQUALVERIFY, OP_HASH160};
use crate::bitcoin::opcodes::{OP_0, OP_TRUE};
use crate::bitcoin::script::Builder;
use crate::bitcoin::{Script, ScriptBuf};
use crate::codec::{
    base58_check_decode, base58_check_encode, bech32_decode_with_variant, bech32_encode,
    Bech32Variant, CodecError,
};
use crate::networks::Network;

/// The output templates the signer knows how to render and verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputScriptType {
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
    P2tr,
}

impl OutputScriptType {
    /// Classifies a scriptPubKey, returning `None` for anything non-standard.
    pub fn classify(script: &Script) -> Option<Self> {
        if script.is_p2pkh() {
            Some(OutputScriptType::P2pkh)
        } else if script.is_p2sh() {
            Some(OutputScriptType::P2sh)
        } else if script.is_p2wpkh() {
            Some(OutputScriptType::P2wpkh)
        } else if script.is_p2wsh() {
            Some(OutputScriptType::P2wsh)
        } else if script.is_p2tr() {
            Some(OutputScriptType::P2tr)
        } else {
            None
        }
    }

    /// Templates committing to exactly one public key
    pub fn is_single_key(self) -> bool {
        matches!(
            self,
            OutputScriptType::P2pkh | OutputScriptType::P2wpkh | OutputScriptType::P2tr
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputScriptType::P2pkh => "p2pkh",
            OutputScriptType::P2sh => "p2sh",
            OutputScriptType::P2wpkh => "p2wpkh",
            OutputScriptType::P2wsh => "p2wsh",
            OutputScriptType::P2tr => "p2tr",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The script is not one of the known templates
    UnsupportedScript,
    /// The address string failed to decode
    Encoding(CodecError),
    /// Valid address, but for another network
    WrongNetwork,
    /// Witness version and program length do not form a known template,
    /// or the checksum variant does not match the witness version
    InvalidProgram,
}

impl std::fmt::Display for AddressError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressError::UnsupportedScript => write!(f, "unsupported output script"),
            AddressError::Encoding(e) => write!(f, "invalid address encoding: {}", e),
            AddressError::WrongNetwork => write!(f, "address is for a different network"),
            AddressError::InvalidProgram => write!(f, "invalid witness program"),
        }
    }
}

impl std::error::Error for AddressError {}

impl From<CodecError> for AddressError {
    fn from(e: CodecError) -> Self {
        AddressError::Encoding(e)
    }
}

/// Renders a scriptPubKey as an address string for `network`.
///
/// # Arguments
/// * `script` - The output script to render
/// * `network` - Selects version bytes and the bech32 human-readable part
///
/// # Returns
/// * `Err(AddressError::UnsupportedScript)` if the script is not a known template
pub fn from_output_script_with_network(
    script: &Script,
    network: Network,
) -> Result<String, AddressError> {
    let bytes = script.as_bytes();
    let script_type = OutputScriptType::classify(script).ok_or(AddressError::UnsupportedScript)?;
    let address = match script_type {
        OutputScriptType::P2pkh => base58_address(network.p2pkh_version(), &bytes[3..23])?,
        OutputScriptType::P2sh => base58_address(network.p2sh_version(), &bytes[2..22])?,
        OutputScriptType::P2wpkh | OutputScriptType::P2wsh => {
            bech32_encode(network.hrp(), 0, &bytes[2..], Bech32Variant::Bech32)?
        }
        OutputScriptType::P2tr => {
            bech32_encode(network.hrp(), 1, &bytes[2..], Bech32Variant::Bech32m)?
        }
    };
    Ok(address)
}

/// Parses an address string for `network` back into its scriptPubKey.
pub fn to_output_script_with_network(
    address: &str,
    network: Network,
) -> Result<ScriptBuf, AddressError> {
    if let Ok((variant, hrp, version, program)) = bech32_decode_with_variant(address) {
        if hrp != network.hrp() {
            return Err(AddressError::WrongNetwork);
        }
        if variant != Bech32Variant::for_witness_version(version) {
            return Err(AddressError::InvalidProgram);
        }
        return witness_script(version, &program);
    }

    let payload = base58_check_decode(address)?;
    if payload.len() != 21 {
        return Err(AddressError::Encoding(CodecError::CorruptEncoding));
    }
    let (version, hash) = (payload[0], &payload[1..]);
    let hash: [u8; 20] = hash
        .try_into()
        .map_err(|_| AddressError::Encoding(CodecError::CorruptEncoding))?;
    if version == network.p2pkh_version() {
        Ok(Builder::new()
            .push_opcode(OP_DUP)
            .push_opcode(OP_HASH160)
            .push_slice(hash)
            .push_opcode(OP_EQUALVERIFY)
            .push_opcode(OP_CHECKSIG)
            .into_script())
    } else if version == network.p2sh_version() {
        Ok(Builder::new()
            .push_opcode(OP_HASH160)
            .push_slice(hash)
            .push_opcode(OP_EQUAL)
            .into_script())
    } else {
        Err(AddressError::WrongNetwork)
    }
}

fn base58_address(version: u8, hash: &[u8]) -> Result<String, CodecError> {
    let mut payload = Vec::with_capacity(1 + hash.len());
    payload.push(version);
    payload.extend_from_slice(hash);
    base58_check_encode(&payload)
}

fn witness_script(version: u8, program: &[u8]) -> Result<ScriptBuf, AddressError> {
    match (version, program.len()) {
        (0, 20) | (0, 32) => {
            let program: &crate::bitcoin::script::PushBytes = program
                .try_into()
                .map_err(|_| AddressError::InvalidProgram)?;
            Ok(Builder::new()
                .push_opcode(OP_0)
                .push_slice(program)
                .into_script())
        }
        (1, 32) => {
            let program: [u8; 32] = program
                .try_into()
                .map_err(|_| AddressError::InvalidProgram)?;
            Ok(Builder::new()
                .push_opcode(OP_TRUE)
                .push_slice(program)
                .into_script())
        }
        _ => Err(AddressError::InvalidProgram),
    }
}
