//! Error types for the systolic array engine

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors raised synchronously by the dataflow engine.
///
/// None of these are transient: the simulator is deterministic, so the same
/// misconfiguration fails the same way every time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
  /// A value written to a buffer or word has the wrong lane count
  #[error("size mismatch: expected width {expected}, got {actual}")]
  SizeMismatch {
    /// Declared width
    expected: usize,
    /// Width of the offending value
    actual: usize,
  },

  /// A matrix does not fit the feed bank or array it is loaded into
  #[error("shape mismatch: {context} (expected {expected}, got {actual})")]
  ShapeMismatch {
    /// What was being compared
    context: String,
    /// Dimension the receiver expects
    expected: usize,
    /// Dimension that was supplied
    actual: usize,
  },

  /// The tick limit was reached before every MA cell finished
  #[error("array stalled after {ticks} ticks with unfinished cells")]
  Stalled {
    /// Ticks performed before giving up
    ticks: u64,
  },

  /// An edge cell that is not a source feed was asked to load data
  #[error("edge cell {index} is not a source feed and cannot be loaded")]
  NotLoadable {
    /// Position of the edge cell in its bank
    index: usize,
  },
}

impl SimError {
  pub(crate) fn shape(context: impl Into<String>, expected: usize, actual: usize) -> Self {
    SimError::ShapeMismatch {
      context: context.into(),
      expected,
      actual,
    }
  }
}

impl From<SimError> for std::io::Error {
  fn from(err: SimError) -> Self {
    let kind = match &err {
      SimError::Stalled { .. } => std::io::ErrorKind::TimedOut,
      _ => std::io::ErrorKind::InvalidInput,
    };
    std::io::Error::new(kind, err)
  }
}
