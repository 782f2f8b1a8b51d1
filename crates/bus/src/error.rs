use thiserror::Error;

/// Error returned by a handler.
///
/// Handlers may fail with any error type; the bus only logs it (commands,
/// events) or hands it back to the asker (queries).
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type HandlerResult<T = ()> = Result<T, HandlerError>;

/// Dispatch-level failure.
///
/// Only `NoHandlerRegistered` is raised synchronously (`tell`); the other
/// variants reach callers through `ask`.
#[derive(Debug, Error)]
pub enum BusError {
    /// No handler is registered for the message kind.
    #[error("the {kind} handler is not registered")]
    NoHandlerRegistered { kind: &'static str },

    /// The handler answering a query failed.
    #[error("the {kind} handler failed: {source}")]
    HandlerFailure {
        kind: &'static str,
        #[source]
        source: HandlerError,
    },

    /// Every handler of a query went away (e.g. panicked) without answering.
    #[error("the {kind} handler finished without answering")]
    Abandoned { kind: &'static str },
}

impl BusError {
    pub fn kind(&self) -> &'static str {
        match self {
            BusError::NoHandlerRegistered { kind }
            | BusError::HandlerFailure { kind, .. }
            | BusError::Abandoned { kind } => kind,
        }
    }

    pub fn is_no_handler(&self) -> bool {
        matches!(self, BusError::NoHandlerRegistered { .. })
    }
}
