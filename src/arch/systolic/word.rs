use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Host scalar used for every lane in the array
pub type Scalar = f32;

/// Fixed-width bundle of scalar lanes carried by a handshake buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
  lanes: Vec<Scalar>,
}

impl Word {
  /// Create a zeroed word with `width` lanes
  pub fn zeros(width: usize) -> Self {
    Self {
      lanes: vec![0.0; width],
    }
  }

  /// Single-lane word
  pub fn scalar(value: Scalar) -> Self {
    Self { lanes: vec![value] }
  }

  pub fn width(&self) -> usize {
    self.lanes.len()
  }

  /// Overwrite every lane. The new values must match the current width.
  pub fn set(&mut self, vals: &[Scalar]) -> Result<()> {
    if vals.len() != self.lanes.len() {
      return Err(SimError::SizeMismatch {
        expected: self.lanes.len(),
        actual: vals.len(),
      });
    }
    self.lanes.copy_from_slice(vals);
    Ok(())
  }

  pub fn lane(&self, at: usize) -> Option<Scalar> {
    self.lanes.get(at).copied()
  }

  /// Lane 0, or zero for an empty word
  pub fn first(&self) -> Scalar {
    self.lanes.first().copied().unwrap_or(0.0)
  }

  pub fn lanes(&self) -> &[Scalar] {
    &self.lanes
  }
}

impl From<Scalar> for Word {
  fn from(value: Scalar) -> Self {
    Word::scalar(value)
  }
}

impl From<Vec<Scalar>> for Word {
  fn from(lanes: Vec<Scalar>) -> Self {
    Self { lanes }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_word_width() {
    let w = Word::zeros(4);
    assert_eq!(w.width(), 4);
    assert_eq!(w.lane(3), Some(0.0));
    assert_eq!(w.lane(4), None);
  }

  #[test]
  fn test_word_set_checks_width() {
    let mut w = Word::zeros(4);
    assert_eq!(
      w.set(&[1.0, 2.0]),
      Err(SimError::SizeMismatch {
        expected: 4,
        actual: 2
      })
    );

    w.set(&[1.0, 2.0, 3.0, 4.0]).unwrap();
    assert_eq!(w.lane(0), Some(1.0));
    assert_eq!(w.first(), 1.0);
  }
}
