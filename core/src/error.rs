// authflow/src/error.rs
use std::time::Duration;

use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Failures synthesized by the engine itself.
///
/// Errors raised by module hooks or transports are never converted into a
/// `FlowError`; they travel inside `FailureNode` exactly as they were returned.
/// A `FlowError` only appears when the engine has to explain something on
/// its own (no module claimed a response, the network call timed out, ...).
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Unhandled response: no module produced a node for status {status}")]
  UnhandledResponse { status: u16 },

  #[error("Server returned status {status}: {body}")]
  Api { status: u16, body: String },

  #[error("Invalid response: {0}")]
  InvalidResponse(String),

  #[error("Request has no target URL")]
  MissingUrl,

  #[error("Request timed out after {0:?}")]
  Timeout(Duration),

  #[error("next() called on a terminal {kind} node")]
  TerminalNode { kind: &'static str },

  #[error("ContinueNode is not attached to a workflow")]
  DetachedNode,

  #[error("Shared context key '{key}' holds {actual}, not {expected}")]
  TypeMismatch {
    key: String,
    expected: &'static str,
    actual: &'static str,
  },

  #[error("Hook panicked: {0}")]
  Panicked(String),

  #[error("Configuration error: {0}")]
  Configuration(String),

  #[error("Transport error. Source: {source}")]
  Transport {
    #[source]
    source: AnyhowError,
  },
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
