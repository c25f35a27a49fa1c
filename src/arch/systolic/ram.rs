use super::buffer::{BufferArena, BufferId};
use super::word::Word;
use crate::error::Result;

/// Non-exhausting source for static operands: answers every request with the same word
#[derive(Debug, Clone)]
pub struct ConstantStore {
  value: Word,
  output: BufferId,
  label: String,
}

impl ConstantStore {
  pub fn new(arena: &mut BufferArena, value: Word, label: impl Into<String>) -> Self {
    let label = label.into();
    let output = arena.alloc(value.width(), format!("{}.out", label));
    Self { value, output, label }
  }

  pub fn consume(&mut self, _arena: &mut BufferArena) {}

  pub fn emit(&mut self, arena: &mut BufferArena) -> Result<()> {
    let out = &mut arena[self.output];
    if out.request_open() {
      out.set(Some(self.value.clone()))?;
      out.close_request();
    }
    Ok(())
  }

  /// Never finished
  pub fn finished(&self) -> bool {
    false
  }

  pub fn value(&self) -> &Word {
    &self.value
  }

  pub fn output(&self) -> BufferId {
    self.output
  }

  pub fn label(&self) -> &str {
    &self.label
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_never_exhausts() {
    let mut arena = BufferArena::new();
    let mut ram = ConstantStore::new(&mut arena, Word::from(vec![1.0, 2.0]), "ram");
    assert_eq!(arena[ram.output()].width(), 2);

    for _ in 0..5 {
      arena[ram.output()].open_request();
      ram.emit(&mut arena).unwrap();
      assert_eq!(arena[ram.output()].get(), Some(Word::from(vec![1.0, 2.0])));
    }
    assert!(!ram.finished());
  }

  #[test]
  fn test_waits_for_request() {
    let mut arena = BufferArena::new();
    let mut ram = ConstantStore::new(&mut arena, Word::scalar(3.0), "ram");
    ram.emit(&mut arena).unwrap();
    assert!(arena[ram.output()].is_empty());
  }
}
