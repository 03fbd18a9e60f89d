use strum::EnumIter;

/// Every way a PSBT validation can fail.
///
/// Variants carry no payload. The index of the offending input or output is
/// reported through the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum ValidationError {
    /// An engine invariant was violated (negative fee, overflow, aborted sink)
    InternalError,
    /// The master key bytes are malformed or unusable for derivation
    InvalidXpriv,
    /// The PSBT bytes are not a well-formed PSBT
    ParserError,
    /// A witness script does not hash to the program it claims to satisfy
    InvalidWitnessScript,
    /// A redeem script does not hash to the P2SH script it claims to satisfy
    InvalidRedeemScript,
    /// An input requests a sighash flag the device does not sign
    UnsupportedSighash,
    /// The attached previous transaction is not the one the input spends
    TxidMismatch,
    /// An input has neither a witness nor a non-witness UTXO
    MissingPreviousTxid,
    /// A script-hash spend or output is missing its redeem/witness script
    MissingRedeemWitnessScript,
    /// A taproot output key is not the tweak of the derived internal key
    TaprootOutputInvalidPublicKey,
    /// The unsigned transaction has more inputs than the device supports
    TooManyInputs,
    /// The unsigned transaction has more outputs than the device supports
    TooManyOutputs,
    /// An output map carries more derivation keys than the device supports
    TooManyOutputKeys,
    /// A key appears twice in one map, or a single-key script lists several keys
    MultipleKeysNotExpected,
    /// A public key claimed to be ours does not derive from the master key
    FraudulentOutputPublicKey,
    /// The PSBT ends before every output map was provided
    MissingOutput,
    /// An output script is not one of the known templates
    UnknownOutputScript,
    /// A witness UTXO cannot be committed to by the spend it accompanies
    FraudulentWitnessUtxo,
}

/// Broad classes the binding layer surfaces to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "inspect", derive(serde::Serialize))]
#[cfg_attr(feature = "inspect", serde(rename_all = "lowercase"))]
pub enum ErrorCategory {
    /// The PSBT is malformed or exceeds device limits
    Parse,
    /// The PSBT is consistent but adversarial or incorrect
    Fraud,
    /// Engine bug or unusable key; treat as a hard stop and never retry
    Internal,
}

impl ValidationError {
    /// Stable numeric tag, in taxonomy order.
    pub fn code(self) -> u8 {
        match self {
            ValidationError::InternalError => 0,
            ValidationError::InvalidXpriv => 1,
            ValidationError::ParserError => 2,
            ValidationError::InvalidWitnessScript => 3,
            ValidationError::InvalidRedeemScript => 4,
            ValidationError::UnsupportedSighash => 5,
            ValidationError::TxidMismatch => 6,
            ValidationError::MissingPreviousTxid => 7,
            ValidationError::MissingRedeemWitnessScript => 8,
            ValidationError::TaprootOutputInvalidPublicKey => 9,
            ValidationError::TooManyInputs => 10,
            ValidationError::TooManyOutputs => 11,
            ValidationError::TooManyOutputKeys => 12,
            ValidationError::MultipleKeysNotExpected => 13,
            ValidationError::FraudulentOutputPublicKey => 14,
            ValidationError::MissingOutput => 15,
            ValidationError::UnknownOutputScript => 16,
            ValidationError::FraudulentWitnessUtxo => 17,
        }
    }

    /// Inverse of [`ValidationError::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        use strum::IntoEnumIterator;
        ValidationError::iter().find(|e| e.code() == code)
    }

    pub fn category(self) -> ErrorCategory {
        match self {
            ValidationError::InternalError | ValidationError::InvalidXpriv => {
                ErrorCategory::Internal
            }
            ValidationError::ParserError
            | ValidationError::TooManyInputs
            | ValidationError::TooManyOutputs
            | ValidationError::TooManyOutputKeys
            | ValidationError::MultipleKeysNotExpected
            | ValidationError::MissingOutput => ErrorCategory::Parse,
            ValidationError::InvalidWitnessScript
            | ValidationError::InvalidRedeemScript
            | ValidationError::UnsupportedSighash
            | ValidationError::TxidMismatch
            | ValidationError::MissingPreviousTxid
            | ValidationError::MissingRedeemWitnessScript
            | ValidationError::TaprootOutputInvalidPublicKey
            | ValidationError::FraudulentOutputPublicKey
            | ValidationError::UnknownOutputScript
            | ValidationError::FraudulentWitnessUtxo => ErrorCategory::Fraud,
        }
    }

    /// Name of the tag as shown to the binding layer.
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationError::InternalError => "InternalError",
            ValidationError::InvalidXpriv => "InvalidXpriv",
            ValidationError::ParserError => "ParserError",
            ValidationError::InvalidWitnessScript => "InvalidWitnessScript",
            ValidationError::InvalidRedeemScript => "InvalidRedeemScript",
            ValidationError::UnsupportedSighash => "UnsupportedSighash",
            ValidationError::TxidMismatch => "TxidMismatch",
            ValidationError::MissingPreviousTxid => "MissingPreviousTxid",
            ValidationError::MissingRedeemWitnessScript => "MissingRedeemWitnessScript",
            ValidationError::TaprootOutputInvalidPublicKey => "TaprootOutputInvalidPublicKey",
            ValidationError::TooManyInputs => "TooManyInputs",
            ValidationError::TooManyOutputs => "TooManyOutputs",
            ValidationError::TooManyOutputKeys => "TooManyOutputKeys",
            ValidationError::MultipleKeysNotExpected => "MultipleKeysNotExpected",
            ValidationError::FraudulentOutputPublicKey => "FraudulentOutputPublicKey",
            ValidationError::MissingOutput => "MissingOutput",
            ValidationError::UnknownOutputScript => "UnknownOutputScript",
            ValidationError::FraudulentWitnessUtxo => "FraudulentWitnessUtxo",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            ValidationError::InternalError => "internal error",
            ValidationError::InvalidXpriv => "invalid master private key",
            ValidationError::ParserError => "malformed PSBT",
            ValidationError::InvalidWitnessScript => "witness script does not match",
            ValidationError::InvalidRedeemScript => "redeem script does not match",
            ValidationError::UnsupportedSighash => "unsupported sighash type",
            ValidationError::TxidMismatch => "previous transaction id mismatch",
            ValidationError::MissingPreviousTxid => "previous transaction missing",
            ValidationError::MissingRedeemWitnessScript => "redeem or witness script missing",
            ValidationError::TaprootOutputInvalidPublicKey => "invalid taproot output key",
            ValidationError::TooManyInputs => "too many inputs",
            ValidationError::TooManyOutputs => "too many outputs",
            ValidationError::TooManyOutputKeys => "too many keys in output",
            ValidationError::MultipleKeysNotExpected => "multiple keys not expected",
            ValidationError::FraudulentOutputPublicKey => "fraudulent output public key",
            ValidationError::MissingOutput => "missing output",
            ValidationError::UnknownOutputScript => "unknown output script",
            ValidationError::FraudulentWitnessUtxo => "fraudulent witness UTXO",
        };
        write!(f, "{} ({})", message, self.as_str())
    }
}

impl std::error::Error for ValidationError {}

impl From<crate::codec::CodecError> for ValidationError {
    fn from(_: crate::codec::CodecError) -> Self {
        ValidationError::ParserError
    }
}

impl From<crate::bitcoin::bip32::Error> for ValidationError {
    fn from(_: crate::bitcoin::bip32::Error) -> Self {
        ValidationError::InvalidXpriv
    }
}
