pub mod address;
pub mod codec;
mod error;
pub mod event;
pub mod keys;
mod networks;
pub mod psbt;
#[cfg(test)]
mod test_utils;
pub mod validate;

// re-export bitcoin from the miniscript crate
// callers and tests build transactions with the same types the engine decodes into
pub use ::miniscript::bitcoin;

pub use address::{from_output_script_with_network, to_output_script_with_network};
pub use error::{ErrorCategory, ValidationError};
pub use event::{EventSink, EventSinkError, NoopSink, RecordingSink, ValidationEvent};
pub use keys::ExtendedPrivateKey;
pub use networks::Network;
pub use validate::{validate, validate_range, TransactionSummary, ValidationResult};
