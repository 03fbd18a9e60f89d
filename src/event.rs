//! Events emitted while a validation runs, and the observer that receives them.

use crate::error::ValidationError;

/// Something the caller may want to show before the final result arrives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "inspect", derive(serde::Serialize))]
#[cfg_attr(feature = "inspect", serde(tag = "type", rename_all = "snake_case"))]
pub enum ValidationEvent {
    /// Coarse progress through the inputs and outputs, 0..=100
    Progress { percent: u8 },
    /// An output paying somewhere not derivable from the master key
    OutputAddress { address: String, amount: u64 },
    /// An output verified to pay back to the master key
    ChangeAddress { address: String, amount: u64 },
}

/// Why an [`EventSink`] stopped the validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSinkError {
    /// The sink knows which validation outcome it wants reported
    Classified(ValidationError),
    /// Anything else; reported as `InternalError`
    Aborted(String),
}

impl std::fmt::Display for EventSinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventSinkError::Classified(e) => write!(f, "event sink failed: {}", e),
            EventSinkError::Aborted(msg) => write!(f, "event sink aborted: {}", msg),
        }
    }
}

impl std::error::Error for EventSinkError {}

impl From<EventSinkError> for ValidationError {
    fn from(e: EventSinkError) -> Self {
        match e {
            EventSinkError::Classified(e) => e,
            EventSinkError::Aborted(_) => ValidationError::InternalError,
        }
    }
}

/// Synchronous observer called from inside the validation.
///
/// The returned flag tells the host whether to repaint; the engine only
/// passes it on to the log. Returning an error terminates the validation
/// with that error.
pub trait EventSink {
    fn on_event(&mut self, event: &ValidationEvent) -> Result<bool, EventSinkError>;
}

impl<F> EventSink for F
where
    F: FnMut(&ValidationEvent) -> Result<bool, EventSinkError>,
{
    fn on_event(&mut self, event: &ValidationEvent) -> Result<bool, EventSinkError> {
        self(event)
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn on_event(&mut self, _event: &ValidationEvent) -> Result<bool, EventSinkError> {
        Ok(false)
    }
}

/// Keeps every event in order of emission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingSink {
    pub events: Vec<ValidationEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn change_addresses(&self) -> impl Iterator<Item = (&str, u64)> {
        self.events.iter().filter_map(|e| match e {
            ValidationEvent::ChangeAddress { address, amount } => Some((address.as_str(), *amount)),
            _ => None,
        })
    }

    pub fn output_addresses(&self) -> impl Iterator<Item = (&str, u64)> {
        self.events.iter().filter_map(|e| match e {
            ValidationEvent::OutputAddress { address, amount } => Some((address.as_str(), *amount)),
            _ => None,
        })
    }
}

impl EventSink for RecordingSink {
    fn on_event(&mut self, event: &ValidationEvent) -> Result<bool, EventSinkError> {
        self.events.push(event.clone());
        Ok(true)
    }
}
