use crate::error::ValidationError;

use super::TransactionSummary;

/// Running totals built while walking inputs and outputs.
///
/// All arithmetic is checked; an overflow is an engine invariant violation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationAccumulator {
    total_input: u64,
    total_output: u64,
    total_change: u64,
    external_outputs: usize,
    signable_inputs: usize,
}

impl ValidationAccumulator {
    pub fn add_input(&mut self, value: u64, signable: bool) -> Result<(), ValidationError> {
        self.total_input = self
            .total_input
            .checked_add(value)
            .ok_or(ValidationError::InternalError)?;
        if signable {
            self.signable_inputs += 1;
        }
        Ok(())
    }

    pub fn add_output(&mut self, value: u64, is_change: bool) -> Result<(), ValidationError> {
        self.total_output = self
            .total_output
            .checked_add(value)
            .ok_or(ValidationError::InternalError)?;
        if is_change {
            self.total_change = self
                .total_change
                .checked_add(value)
                .ok_or(ValidationError::InternalError)?;
        } else {
            self.external_outputs += 1;
        }
        Ok(())
    }

    pub fn total_input(&self) -> u64 {
        self.total_input
    }

    pub fn total_output(&self) -> u64 {
        self.total_output
    }

    pub fn signable_inputs(&self) -> usize {
        self.signable_inputs
    }

    pub fn external_outputs(&self) -> usize {
        self.external_outputs
    }

    /// Computes the fee and builds the summary.
    ///
    /// Outputs exceeding inputs is `InternalError`, never a wrapped fee.
    pub fn finalize(&self) -> Result<TransactionSummary, ValidationError> {
        let fee = self
            .total_input
            .checked_sub(self.total_output)
            .ok_or(ValidationError::InternalError)?;
        Ok(TransactionSummary {
            total_with_change: self.total_output,
            total_change: self.total_change,
            fee,
            is_self_send: self.external_outputs == 0,
        })
    }
}
