use thiserror::Error;
use wbot_core::WatchError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// The key's queue is full; the caller drops the event without replying.
    #[error("Overloaded")]
    Overloaded,

    #[error("Queue store error: {0}")]
    Store(String),
}

impl From<GateError> for WatchError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Overloaded => WatchError::Overloaded,
            GateError::Store(msg) => WatchError::TransientStore(msg),
        }
    }
}
