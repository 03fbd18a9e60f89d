//! Validation state machine.
//!
//! `Init -> DerivingKeys -> WalkingInputs -> WalkingOutputs -> Finalizing`,
//! strictly in that order. The first failure ends the call; no partial summary
//! is ever returned.

mod accumulator;
mod input;
mod output;

pub use accumulator::ValidationAccumulator;
pub use output::OutputClass;

use strum::Display;

use crate::address::from_output_script_with_network;
use crate::bitcoin::bip32::Xpub;
use crate::bitcoin::TxOut;
use crate::error::ValidationError;
use crate::event::{EventSink, ValidationEvent};
use crate::keys::{ExtendedPrivateKey, KeyDeriver};
use crate::networks::Network;
use crate::psbt::{GlobalMap, GlobalXpub, PsbtReader};

/// What the device shows the user once every check has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "inspect", derive(serde::Serialize))]
pub struct TransactionSummary {
    /// Sum of every output, change included
    pub total_with_change: u64,
    pub total_change: u64,
    pub fee: u64,
    /// Every output pays back to the master key
    pub is_self_send: bool,
}

impl TransactionSummary {
    /// Amount leaving the wallet, excluding the fee
    pub fn total_external(&self) -> u64 {
        self.total_with_change - self.total_change
    }
}

pub type ValidationResult = Result<TransactionSummary, ValidationError>;

/// Validator state
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
pub enum State {
    /// Checking the container and the global map
    Init,
    /// Expanding the master key
    DerivingKeys,
    WalkingInputs,
    WalkingOutputs,
    /// Computing the fee
    Finalizing,
}

/// Global xpubs carrying our fingerprint must derive from the master key.
///
/// Entries from other masters (cosigners) are not ours to judge.
fn check_global_xpubs(deriver: &KeyDeriver, xpubs: &[GlobalXpub]) -> Result<(), ValidationError> {
    for entry in xpubs
        .iter()
        .filter(|x| x.origin.fingerprint == deriver.fingerprint())
    {
        let derived = deriver.derive_xpub(&entry.origin.path)?;
        // version bytes are the coordinator's choice
        let derived = Xpub {
            network: entry.xpub.network,
            ..derived
        };
        if derived != entry.xpub {
            log::warn!("global xpub at {} does not derive from the master key", entry.origin);
            return Err(ValidationError::FraudulentOutputPublicKey);
        }
        log::debug!("global xpub at {} verified", entry.origin);
    }
    Ok(())
}

struct Validator<'s, S: EventSink> {
    network: Network,
    sink: &'s mut S,
    state: State,
    accumulator: ValidationAccumulator,
    total_steps: usize,
    steps_done: usize,
}

impl<'s, S: EventSink> Validator<'s, S> {
    fn new(network: Network, sink: &'s mut S) -> Self {
        log::debug!("validator state: {}", State::Init);
        Validator {
            network,
            sink,
            state: State::Init,
            accumulator: ValidationAccumulator::default(),
            total_steps: 0,
            steps_done: 0,
        }
    }

    fn transition(&mut self, next: State) {
        log::debug!("validator state: {} -> {}", self.state, next);
        self.state = next;
    }

    fn emit(&mut self, event: ValidationEvent) -> Result<(), ValidationError> {
        let refresh = self.sink.on_event(&event).map_err(|e| {
            log::warn!("event sink stopped validation: {}", e);
            ValidationError::from(e)
        })?;
        log::trace!("event {:?} delivered, refresh requested: {}", event, refresh);
        Ok(())
    }

    fn step(&mut self) -> Result<(), ValidationError> {
        self.steps_done += 1;
        let percent = self.steps_done * 100 / self.total_steps;
        self.emit(ValidationEvent::Progress {
            percent: percent.min(100) as u8,
        })
    }

    fn run(&mut self, psbt: &[u8], master_key: &ExtendedPrivateKey) -> ValidationResult {
        let (mut reader, global) = PsbtReader::new(psbt)?;
        let GlobalMap { unsigned_tx, xpubs, .. } = global;
        self.total_steps = unsigned_tx.inputs.len() + unsigned_tx.outputs.len();
        log::debug!(
            "psbt with {} inputs and {} outputs",
            unsigned_tx.inputs.len(),
            unsigned_tx.outputs.len()
        );

        self.transition(State::DerivingKeys);
        let deriver = KeyDeriver::new(master_key, self.network)?;
        check_global_xpubs(&deriver, &xpubs)?;

        self.transition(State::WalkingInputs);
        for (index, unsigned) in unsigned_tx.inputs.iter().enumerate() {
            let map = reader.next_input()?.ok_or(ValidationError::InternalError)?;
            let checked = input::check_input(&deriver, index, unsigned, &map).map_err(|e| {
                log::warn!("input {} rejected: {}", index, e);
                e
            })?;
            log::debug!(
                "input {}: {} sat, signable: {}",
                index,
                checked.value.to_sat(),
                checked.signable
            );
            self.accumulator
                .add_input(checked.value.to_sat(), checked.signable)?;
            self.step()?;
        }

        self.transition(State::WalkingOutputs);
        for (index, tx_output) in unsigned_tx.outputs.iter().enumerate() {
            let map = reader.next_output()?.ok_or(ValidationError::InternalError)?;
            let class = output::classify_output(&deriver, self.network, tx_output, &map)
                .map_err(|e| {
                    log::warn!("output {} rejected: {}", index, e);
                    e
                })?;
            self.record_output(index, tx_output, class)?;
            self.step()?;
        }
        reader.finish()?;
        drop(deriver);

        self.transition(State::Finalizing);
        if self.accumulator.signable_inputs() == 0 {
            log::warn!("no input can be signed with this master key");
        }
        let summary = self.accumulator.finalize().map_err(|e| {
            log::warn!(
                "outputs ({} sat) exceed inputs ({} sat)",
                self.accumulator.total_output(),
                self.accumulator.total_input()
            );
            e
        })?;
        log::debug!("validation passed: {:?}", summary);
        Ok(summary)
    }

    fn record_output(
        &mut self,
        index: usize,
        tx_output: &TxOut,
        class: OutputClass,
    ) -> Result<(), ValidationError> {
        let amount = tx_output.value.to_sat();
        let address = from_output_script_with_network(&tx_output.script_pubkey, self.network)
            .map_err(|_| ValidationError::InternalError)?;
        match class {
            OutputClass::External => {
                log::debug!("output {}: external", index);
                self.accumulator.add_output(amount, false)?;
                self.emit(ValidationEvent::OutputAddress { address, amount })
            }
            OutputClass::Change { non_standard_path } => {
                if non_standard_path {
                    log::info!("output {}: change on a non-standard derivation path", index);
                }
                log::debug!("output {}: change", index);
                self.accumulator.add_output(amount, true)?;
                self.emit(ValidationEvent::ChangeAddress { address, amount })
            }
        }
    }
}

/// Validates a PSBT against a root master key.
///
/// # Arguments
/// * `psbt` - The serialized PSBT
/// * `network` - Network addresses are rendered for
/// * `master_key` - Root key; wiped before this function returns
/// * `sink` - Receives progress and address events as validation runs
///
/// # Returns
/// * `Ok(TransactionSummary)` when every input and output checks out
/// * `Err(ValidationError)` naming the first failure found
pub fn validate<S: EventSink>(
    psbt: &[u8],
    network: Network,
    master_key: ExtendedPrivateKey,
    sink: &mut S,
) -> ValidationResult {
    Validator::new(network, sink).run(psbt, &master_key)
}

/// Validates `len` bytes at `offset` of a larger caller-owned buffer, in place.
///
/// A range outside the buffer is `ParserError`.
pub fn validate_range<S: EventSink>(
    buffer: &[u8],
    offset: usize,
    len: usize,
    network: Network,
    master_key: ExtendedPrivateKey,
    sink: &mut S,
) -> ValidationResult {
    let psbt = offset
        .checked_add(len)
        .and_then(|end| buffer.get(offset..end))
        .ok_or(ValidationError::ParserError)?;
    validate(psbt, network, master_key, sink)
}
