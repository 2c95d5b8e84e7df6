//! Error types for `fefo-core`.

use thiserror::Error;

/// Domain failures. Every operation that returns one of these has left the
/// ledger untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error(
    "insufficient stock for {reference}: requested {requested}, available {available}"
  )]
  InsufficientStock {
    reference: String,
    requested: u64,
    available: u64,
  },

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("illegal deletion: {0}")]
  IllegalDeletion(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
