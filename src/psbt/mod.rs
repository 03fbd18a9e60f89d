//! PSBT (BIP174, version 0) structural parser.
//!
//! The buffer is walked once, front to back: global map, then one map per
//! input, then one map per output. [`PsbtReader`] hands maps out one at a time
//! so the validator can work input-by-input without holding the whole model;
//! [`ParsedPsbt`] collects everything for inspection tools and tests.
//!
//! Declared counts come from the unsigned transaction and are checked against
//! the device limits before anything else is decoded.

mod input;
mod map;
mod output;
mod unsigned_tx;

pub use input::{InputMap, WitnessUtxo};
pub use map::{DerivedKey, KeyDerivation, KeyOrigin};
pub use output::OutputMap;
pub use unsigned_tx::{UnsignedInput, UnsignedTx};

use crate::bitcoin::bip32::Xpub;
use crate::codec::Cursor;
use crate::error::ValidationError;
use map::read_map;

pub const PSBT_MAGIC: [u8; 5] = *b"psbt\xff";

/// Most inputs a transaction may have and still be reviewed on the device
pub const MAX_INPUTS: usize = 100;
pub const MAX_OUTPUTS: usize = 100;
/// Most derivation entries (BIP32 and taproot) in one output map
pub const MAX_KEYS: usize = 15;
/// 21 million BTC in satoshis
pub const MAX_MONEY: u64 = 21_000_000 * 100_000_000;

const PSBT_GLOBAL_UNSIGNED_TX: u64 = 0x00;
const PSBT_GLOBAL_XPUB: u64 = 0x01;
const PSBT_GLOBAL_VERSION: u64 = 0xfb;

/// A `PSBT_GLOBAL_XPUB` entry: an account key and where it sits below its master
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalXpub {
    pub xpub: Xpub,
    pub origin: KeyOrigin,
}

impl GlobalXpub {
    fn decode(key_data: &[u8], value: &[u8]) -> Result<Self, ValidationError> {
        let xpub = Xpub::decode(key_data).map_err(|_| ValidationError::ParserError)?;
        let origin = KeyOrigin::decode(&mut Cursor::new(value))?;
        Ok(GlobalXpub { xpub, origin })
    }
}

/// Decoded global map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalMap {
    pub unsigned_tx: UnsignedTx,
    pub version: u32,
    pub xpubs: Vec<GlobalXpub>,
}

impl GlobalMap {
    fn read(cursor: &mut Cursor<'_>) -> Result<Self, ValidationError> {
        let mut unsigned_tx = None;
        let mut version = 0;
        let mut xpubs = Vec::new();

        read_map(cursor, |pair| {
            match pair.key_type {
                PSBT_GLOBAL_UNSIGNED_TX => {
                    pair.expect_singleton()?;
                    unsigned_tx = Some(UnsignedTx::decode(pair.value)?);
                }
                PSBT_GLOBAL_XPUB => xpubs.push(GlobalXpub::decode(pair.key_data, pair.value)?),
                PSBT_GLOBAL_VERSION => {
                    pair.expect_singleton()?;
                    let mut value = Cursor::new(pair.value);
                    version = value.read_u32_le()?;
                    if !value.is_empty() {
                        return Err(ValidationError::ParserError);
                    }
                }
                // proprietary and unknown global keys
                _ => {}
            }
            Ok(())
        })?;

        if version != 0 {
            return Err(ValidationError::ParserError);
        }
        let unsigned_tx = unsigned_tx.ok_or(ValidationError::ParserError)?;
        Ok(GlobalMap {
            unsigned_tx,
            version,
            xpubs,
        })
    }
}

/// Streaming reader over a PSBT borrowed from the caller.
///
/// Inputs must be drained with [`PsbtReader::next_input`] before outputs are
/// read, and [`PsbtReader::finish`] confirms the buffer held nothing else.
#[derive(Debug)]
pub struct PsbtReader<'a> {
    cursor: Cursor<'a>,
    input_count: usize,
    output_count: usize,
    inputs_read: usize,
    outputs_read: usize,
}

impl<'a> PsbtReader<'a> {
    /// Checks the magic and decodes the global map.
    pub fn new(bytes: &'a [u8]) -> Result<(Self, GlobalMap), ValidationError> {
        let mut cursor = Cursor::new(bytes);
        if cursor.take(PSBT_MAGIC.len())? != PSBT_MAGIC {
            return Err(ValidationError::ParserError);
        }
        let global = GlobalMap::read(&mut cursor)?;
        let reader = PsbtReader {
            cursor,
            input_count: global.unsigned_tx.inputs.len(),
            output_count: global.unsigned_tx.outputs.len(),
            inputs_read: 0,
            outputs_read: 0,
        };
        Ok((reader, global))
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Reads the next input map, or `None` once every input has been read.
    pub fn next_input(&mut self) -> Result<Option<InputMap<'a>>, ValidationError> {
        if self.inputs_read == self.input_count {
            return Ok(None);
        }
        let input = InputMap::read(&mut self.cursor)?;
        self.inputs_read += 1;
        Ok(Some(input))
    }

    /// Reads the next output map, or `None` once every output has been read.
    ///
    /// A buffer that ends exactly where an output map should start is
    /// `MissingOutput`; one that ends inside a map is `ParserError`.
    pub fn next_output(&mut self) -> Result<Option<OutputMap<'a>>, ValidationError> {
        if self.inputs_read != self.input_count {
            return Err(ValidationError::InternalError);
        }
        if self.outputs_read == self.output_count {
            return Ok(None);
        }
        if self.cursor.is_empty() {
            return Err(ValidationError::MissingOutput);
        }
        let output = OutputMap::read(&mut self.cursor)?;
        self.outputs_read += 1;
        Ok(Some(output))
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.inputs_read != self.input_count || self.outputs_read != self.output_count {
            return Err(ValidationError::InternalError);
        }
        if !self.cursor.is_empty() {
            return Err(ValidationError::ParserError);
        }
        Ok(())
    }
}

/// The whole structural decode of a PSBT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPsbt<'a> {
    pub global: GlobalMap,
    pub inputs: Vec<InputMap<'a>>,
    pub outputs: Vec<OutputMap<'a>>,
}

impl<'a> ParsedPsbt<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ValidationError> {
        let (mut reader, global) = PsbtReader::new(bytes)?;
        let mut inputs = Vec::with_capacity(reader.input_count());
        while let Some(input) = reader.next_input()? {
            inputs.push(input);
        }
        let mut outputs = Vec::with_capacity(reader.output_count());
        while let Some(output) = reader.next_output()? {
            outputs.push(output);
        }
        reader.finish()?;
        Ok(ParsedPsbt {
            global,
            inputs,
            outputs,
        })
    }

    pub fn unsigned_tx(&self) -> &UnsignedTx {
        &self.global.unsigned_tx
    }
}
