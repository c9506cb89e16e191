//! Flight-controller capability interface.

use thiserror::Error;
use tokio::sync::{broadcast, oneshot};

use crate::keys::{FlightControllerKey, KeyUpdate, KeyValue};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SdkError {
    #[error("key {0:?} is not writable")]
    ReadOnly(FlightControllerKey),

    #[error("key {0:?} is not an action")]
    NotAnAction(FlightControllerKey),

    #[error("value does not match key {0:?}")]
    TypeMismatch(FlightControllerKey),

    #[error("action rejected by aircraft: {0}")]
    Rejected(String),

    #[error("action result was never reported")]
    Dropped,
}

/// Opaque key/value binding to the aircraft.
///
/// Reads and writes return immediately. Actions complete asynchronously;
/// their outcome arrives through the returned [`ActionHandle`].
pub trait FlightController: Send + Sync {
    fn get(&self, key: FlightControllerKey) -> Option<KeyValue>;

    fn set(&self, key: FlightControllerKey, value: KeyValue) -> Result<(), SdkError>;

    fn perform_action(&self, key: FlightControllerKey) -> ActionHandle;

    /// Stream of telemetry changes. Slow receivers skip ahead.
    fn listen(&self) -> broadcast::Receiver<KeyUpdate>;
}

/// Pending outcome of a flight-controller action.
#[derive(Debug)]
pub struct ActionHandle {
    rx: oneshot::Receiver<Result<(), SdkError>>,
}

/// Reporting side of an [`ActionHandle`].
#[derive(Debug)]
pub struct ActionCompleter {
    tx: oneshot::Sender<Result<(), SdkError>>,
}

impl ActionHandle {
    pub fn pending() -> (ActionCompleter, ActionHandle) {
        let (tx, rx) = oneshot::channel();
        (ActionCompleter { tx }, ActionHandle { rx })
    }

    /// Handle whose outcome is already known.
    pub fn ready(result: Result<(), SdkError>) -> Self {
        let (completer, handle) = Self::pending();
        completer.complete(result);
        handle
    }

    /// Wait for the aircraft to report the outcome.
    pub async fn outcome(self) -> Result<(), SdkError> {
        self.rx.await.unwrap_or(Err(SdkError::Dropped))
    }
}

impl ActionCompleter {
    pub fn complete(self, result: Result<(), SdkError>) {
        // Nobody listening is fine; fire-and-forget callers drop the handle.
        let _ = self.tx.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_handle_resolves() {
        assert_eq!(ActionHandle::ready(Ok(())).outcome().await, Ok(()));
    }

    #[tokio::test]
    async fn test_dropped_completer_reports_dropped() {
        let (completer, handle) = ActionHandle::pending();
        drop(completer);
        assert_eq!(handle.outcome().await, Err(SdkError::Dropped));
    }
}
