//! Core value types for form-fsm.

pub mod context;
pub mod event;
pub mod ident;

pub use context::{ContextPatch, FieldState, FormContext, UnknownField};
pub use event::Event;
pub use ident::{ActionId, EventType, GuardId, Phase, StatePath};

/// Shutdown mode for a running form machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Graceful shutdown: process the events already queued, then stop.
    Graceful,
    /// Immediate shutdown: stop without processing queued events.
    Immediate,
}

/// Error type returned by the runner task.
///
/// Distinguishes errors raised while interpreting the machine from failures
/// of the Tokio task itself (panics or cancellation).
#[derive(Debug, thiserror::Error)]
pub enum TaskError<E> {
    /// Interpreting the machine failed.
    #[error("runtime error: {0}")]
    Runtime(E),
    /// The background task panicked or was cancelled.
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}
