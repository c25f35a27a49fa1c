use super::buffer::{BufferArena, BufferId};
use super::word::{Scalar, Word};
use crate::error::Result;

/// Edge source that replays a fixed operand sequence, one scalar per request
#[derive(Debug, Clone)]
pub struct SourceFeed {
  sequence: Vec<Scalar>,
  cursor: usize,
  output: BufferId,
  label: String,
}

impl SourceFeed {
  /// Create an empty feed and allocate its single-lane output buffer
  pub fn new(arena: &mut BufferArena, label: impl Into<String>) -> Self {
    let label = label.into();
    let output = arena.alloc(1, format!("{}.out", label));
    Self {
      sequence: Vec::new(),
      cursor: 0,
      output,
      label,
    }
  }

  /// Replace the backing sequence and rewind
  pub fn load_from(&mut self, sequence: &[Scalar]) {
    self.sequence = sequence.to_vec();
    self.cursor = 0;
  }

  /// Start the loaded sequence over from its first value
  pub fn rewind(&mut self) {
    self.cursor = 0;
  }

  pub fn consume(&mut self, _arena: &mut BufferArena) {}

  /// Serve an open request on the output with the next scalar, if any remain
  pub fn emit(&mut self, arena: &mut BufferArena) -> Result<()> {
    let out = &mut arena[self.output];
    if !out.request_open() || self.is_exhausted() {
      return Ok(());
    }

    let value = self.sequence[self.cursor];
    out.set(Some(Word::scalar(value)))?;
    out.close_request();
    self.cursor += 1;
    log::trace!("{} -> {}", self.label, value);
    Ok(())
  }

  /// Feeds never hold up the schedule; they gate only through requests.
  pub fn finished(&self) -> bool {
    true
  }

  pub fn is_exhausted(&self) -> bool {
    self.cursor >= self.sequence.len()
  }

  pub fn remaining(&self) -> usize {
    self.sequence.len() - self.cursor
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

  fn poll(feed: &mut SourceFeed, arena: &mut BufferArena) -> Option<Scalar> {
    arena[feed.output()].open_request();
    feed.emit(arena).unwrap();
    arena[feed.output()].get().map(|w| w.first())
  }

  #[test]
  fn test_pull_sequence() {
    let mut arena = BufferArena::new();
    let mut feed = SourceFeed::new(&mut arena, "feed");
    feed.load_from(&[1.0, 2.0, 3.0]);

    assert_eq!(poll(&mut feed, &mut arena), Some(1.0));
    assert_eq!(poll(&mut feed, &mut arena), Some(2.0));
    assert_eq!(poll(&mut feed, &mut arena), Some(3.0));
    assert!(feed.is_exhausted());
    assert_eq!(poll(&mut feed, &mut arena), None);
    assert_eq!(poll(&mut feed, &mut arena), None);

    feed.rewind();
    assert_eq!(feed.remaining(), 3);
    assert_eq!(poll(&mut feed, &mut arena), Some(1.0));

    feed.load_from(&[1.0, 2.0, 3.0]);
    assert_eq!(feed.remaining(), 3);
    assert_eq!(poll(&mut feed, &mut arena), Some(1.0));
  }

  #[test]
  fn test_no_emit_without_request() {
    let mut arena = BufferArena::new();
    let mut feed = SourceFeed::new(&mut arena, "feed");
    feed.load_from(&[5.0]);

    feed.emit(&mut arena).unwrap();
    assert!(arena[feed.output()].is_empty());
    assert_eq!(feed.remaining(), 1);
  }

  #[test]
  fn test_request_stays_open_until_served() {
    let mut arena = BufferArena::new();
    let mut feed = SourceFeed::new(&mut arena, "feed");
    arena[feed.output()].open_request();

    feed.emit(&mut arena).unwrap();
    assert!(arena[feed.output()].request_open());

    feed.load_from(&[4.0]);
    feed.emit(&mut arena).unwrap();
    assert!(!arena[feed.output()].request_open());
    assert_eq!(arena[feed.output()].get(), Some(Word::scalar(4.0)));
  }

  #[test]
  fn test_empty_load_is_exhausted() {
    let mut arena = BufferArena::new();
    let mut feed = SourceFeed::new(&mut arena, "feed");
    feed.load_from(&[]);
    assert!(feed.is_exhausted());
    assert!(feed.finished());
  }
}
