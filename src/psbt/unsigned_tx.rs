use crate::bitcoin::hashes::Hash;
use crate::bitcoin::{
    absolute, transaction, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid,
    Witness,
};
use crate::codec::{read_varint, Cursor};
use crate::error::ValidationError;

use super::{MAX_INPUTS, MAX_MONEY, MAX_OUTPUTS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedInput {
    pub previous_output: OutPoint,
    pub sequence: u32,
}

/// The global unsigned transaction, decoded without scriptSigs or witnesses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTx {
    pub version: i32,
    pub lock_time: u32,
    pub inputs: Vec<UnsignedInput>,
    pub outputs: Vec<TxOut>,
}

impl UnsignedTx {
    /// Decodes the value of `PSBT_GLOBAL_UNSIGNED_TX`.
    ///
    /// Counts are checked against the device limits as soon as they are read,
    /// before any input or output is decoded. The value must be consumed exactly.
    pub fn decode(bytes: &[u8]) -> Result<Self, ValidationError> {
        let mut cursor = Cursor::new(bytes);
        let version = cursor.read_u32_le()? as i32;

        let (input_count, _) = read_varint(&mut cursor)?;
        // 0x00 here is either an empty input list or the segwit marker
        if input_count == 0 {
            return Err(ValidationError::ParserError);
        }
        if input_count > MAX_INPUTS as u64 {
            return Err(ValidationError::TooManyInputs);
        }
        let mut inputs = Vec::with_capacity(input_count as usize);
        for _ in 0..input_count {
            let txid = Txid::from_byte_array(cursor.take_array::<32>()?);
            let vout = cursor.read_u32_le()?;
            if !cursor.read_len_prefixed()?.is_empty() {
                return Err(ValidationError::ParserError);
            }
            let sequence = cursor.read_u32_le()?;
            inputs.push(UnsignedInput {
                previous_output: OutPoint { txid, vout },
                sequence,
            });
        }

        let (output_count, _) = read_varint(&mut cursor)?;
        if output_count == 0 {
            return Err(ValidationError::ParserError);
        }
        if output_count > MAX_OUTPUTS as u64 {
            return Err(ValidationError::TooManyOutputs);
        }
        let mut outputs = Vec::with_capacity(output_count as usize);
        for _ in 0..output_count {
            let value = read_amount(&mut cursor)?;
            let script_pubkey = ScriptBuf::from(cursor.read_len_prefixed()?.to_vec());
            outputs.push(TxOut {
                value,
                script_pubkey,
            });
        }

        let lock_time = cursor.read_u32_le()?;
        if !cursor.is_empty() {
            return Err(ValidationError::ParserError);
        }

        Ok(UnsignedTx {
            version,
            lock_time,
            inputs,
            outputs,
        })
    }

    /// Rebuilds the transaction with empty scriptSigs and witnesses.
    pub fn to_transaction(&self) -> Transaction {
        Transaction {
            version: transaction::Version(self.version),
            lock_time: absolute::LockTime::from_consensus(self.lock_time),
            input: self
                .inputs
                .iter()
                .map(|input| TxIn {
                    previous_output: input.previous_output,
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence(input.sequence),
                    witness: Witness::new(),
                })
                .collect(),
            output: self.outputs.clone(),
        }
    }

    pub fn compute_txid(&self) -> Txid {
        self.to_transaction().compute_txid()
    }
}

/// Reads an 8-byte amount, rejecting anything above the supply cap.
pub(crate) fn read_amount(cursor: &mut Cursor<'_>) -> Result<Amount, ValidationError> {
    let sats = cursor.read_u64_le()?;
    if sats > MAX_MONEY {
        return Err(ValidationError::ParserError);
    }
    Ok(Amount::from_sat(sats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitcoin::consensus::serialize;
    use crate::codec::write_varint;

    fn sample_tx(inputs: usize, outputs: usize) -> Transaction {
        Transaction {
            version: transaction::Version::TWO,
            lock_time: absolute::LockTime::from_consensus(500),
            input: (0..inputs)
                .map(|i| TxIn {
                    previous_output: OutPoint {
                        txid: Txid::from_byte_array([i as u8; 32]),
                        vout: i as u32,
                    },
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
                    witness: Witness::new(),
                })
                .collect(),
            output: (0..outputs)
                .map(|i| {
                    let mut script = vec![0x00, 0x14];
                    script.extend_from_slice(&[i as u8; 20]);
                    TxOut {
                        value: Amount::from_sat(1000 + i as u64),
                        script_pubkey: ScriptBuf::from(script),
                    }
                })
                .collect(),
        }
    }

    #[test]
    fn test_decode_matches_consensus_encoding() {
        let tx = sample_tx(2, 3);
        let decoded = UnsignedTx::decode(&serialize(&tx)).unwrap();
        assert_eq!(decoded.inputs.len(), 2);
        assert_eq!(decoded.outputs, tx.output);
        assert_eq!(decoded.lock_time, 500);
        assert_eq!(decoded.to_transaction(), tx);
        assert_eq!(decoded.compute_txid(), tx.compute_txid());
    }

    #[test]
    fn test_limits_checked_before_elements() {
        // version, then a declared count with no elements behind it
        let mut bytes = 2u32.to_le_bytes().to_vec();
        write_varint(MAX_INPUTS as u64 + 1, &mut bytes);
        assert_eq!(
            UnsignedTx::decode(&bytes),
            Err(ValidationError::TooManyInputs)
        );

        let tx = sample_tx(1, 1);
        let mut bytes = serialize(&tx);
        // version(4) + count(1) + txid(32) + vout(4) + scriptSig len(1) + sequence(4)
        bytes.truncate(4 + 1 + 32 + 4 + 1 + 4);
        write_varint(MAX_OUTPUTS as u64 + 1, &mut bytes);
        assert_eq!(
            UnsignedTx::decode(&bytes),
            Err(ValidationError::TooManyOutputs)
        );
    }

    #[test]
    fn test_at_limit_is_accepted() {
        let tx = sample_tx(MAX_INPUTS, MAX_OUTPUTS);
        assert!(UnsignedTx::decode(&serialize(&tx)).is_ok());
    }

    #[test]
    fn test_rejects_script_sig() {
        let mut tx = sample_tx(1, 1);
        tx.input[0].script_sig = ScriptBuf::from(vec![0x51]);
        assert_eq!(
            UnsignedTx::decode(&serialize(&tx)),
            Err(ValidationError::ParserError)
        );
    }

    #[test]
    fn test_rejects_witness_serialization() {
        let mut tx = sample_tx(1, 1);
        tx.input[0].witness = Witness::from_slice(&[vec![0x01]]);
        assert_eq!(
            UnsignedTx::decode(&serialize(&tx)),
            Err(ValidationError::ParserError)
        );
    }

    #[test]
    fn test_rejects_trailing_bytes_and_excess_amount() {
        let tx = sample_tx(1, 1);
        let mut bytes = serialize(&tx);
        bytes.push(0x00);
        assert_eq!(UnsignedTx::decode(&bytes), Err(ValidationError::ParserError));

        let mut tx = sample_tx(1, 1);
        tx.output[0].value = Amount::from_sat(MAX_MONEY + 1);
        assert_eq!(
            UnsignedTx::decode(&serialize(&tx)),
            Err(ValidationError::ParserError)
        );
    }

    #[test]
    fn test_rejects_empty_outputs() {
        let tx = sample_tx(1, 0);
        assert_eq!(
            UnsignedTx::decode(&serialize(&tx)),
            Err(ValidationError::ParserError)
        );
    }
}
