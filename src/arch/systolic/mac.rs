// ===========================================
// Multiply-Accumulate (MA) Cell
// ===========================================

use super::buffer::{BufferArena, BufferId};
use super::word::{Scalar, Word};
use crate::error::Result;

/// Compute cell of the mesh: drains a left/top operand pair per step,
/// accumulates their product and forwards both operands right and down.
#[derive(Debug, Clone)]
pub struct MultiplyAccumulate {
  /// Upstream buffer carrying the left operand
  left: BufferId,
  /// Upstream buffer carrying the top operand
  top: BufferId,
  /// Pass-through output towards the right neighbor
  right: BufferId,
  /// Pass-through output towards the bottom neighbor
  bottom: BufferId,
  /// Accumulator for the partial result
  acc: Scalar,
  /// Number of accumulations that make the cell finished
  target: usize,
  /// Accumulations performed since the last reset
  steps: usize,
  /// Last drained left value, waiting for the right neighbor
  cached_left: Option<Word>,
  /// Last drained top value, waiting for the bottom neighbor
  cached_top: Option<Word>,
  label: String,
}

impl MultiplyAccumulate {
  /// Create a cell reading from `left` and `top`
  ///
  /// # Arguments
  /// * `arena` - Arena the two pass-through outputs are allocated in
  /// * `left` - Buffer the left operand arrives on
  /// * `top` - Buffer the top operand arrives on
  /// * `target` - Accumulations to perform; 0 makes a pass-through probe
  /// * `label` - Diagnostic name
  pub fn new(arena: &mut BufferArena, left: BufferId, top: BufferId, target: usize, label: impl Into<String>) -> Self {
    let label = label.into();
    let right = arena.alloc(1, format!("{}.right", label));
    let bottom = arena.alloc(1, format!("{}.bottom", label));
    Self {
      left,
      top,
      right,
      bottom,
      acc: 0.0,
      target,
      steps: 0,
      cached_left: None,
      cached_top: None,
      label,
    }
  }

  /// First half of a tick: accumulate when both operands are present,
  /// then request every empty input.
  pub fn consume(&mut self, arena: &mut BufferArena) {
    if self.finished() {
      return;
    }

    if arena[self.left].is_full() && arena[self.top].is_full() {
      if let (Some(a), Some(b)) = (arena[self.left].get(), arena[self.top].get()) {
        self.acc += a.first() * b.first();
        self.steps += 1;
        log::trace!(
          "{}: {} * {} -> acc {} ({}/{})",
          self.label,
          a.first(),
          b.first(),
          self.acc,
          self.steps,
          self.target
        );
        self.cached_left = Some(a);
        self.cached_top = Some(b);
      }
    }

    for input in [self.left, self.top] {
      if arena[input].is_empty() {
        arena[input].open_request();
      }
    }
  }

  /// Second half of a tick: hand cached operands to neighbors that asked for them
  pub fn emit(&mut self, arena: &mut BufferArena) -> Result<()> {
    Self::forward(arena, self.right, &mut self.cached_left)?;
    Self::forward(arena, self.bottom, &mut self.cached_top)
  }

  fn forward(arena: &mut BufferArena, port: BufferId, cached: &mut Option<Word>) -> Result<()> {
    if !arena[port].request_open() {
      return Ok(());
    }
    if let Some(value) = cached.take() {
      arena[port].set(Some(value))?;
      arena[port].close_request();
    }
    Ok(())
  }

  pub fn finished(&self) -> bool {
    self.steps == self.target
  }

  /// Zero the accumulator and step counter. The target is kept.
  pub fn reset(&mut self) {
    self.acc = 0.0;
    self.steps = 0;
  }

  pub fn set_target(&mut self, target: usize) {
    self.target = target;
  }

  /// Forget operands still waiting to be forwarded
  pub fn drop_cached(&mut self) {
    self.cached_left = None;
    self.cached_top = None;
  }

  pub fn accumulator(&self) -> Scalar {
    self.acc
  }

  pub fn steps(&self) -> usize {
    self.steps
  }

  pub fn target(&self) -> usize {
    self.target
  }

  pub fn right(&self) -> BufferId {
    self.right
  }

  pub fn bottom(&self) -> BufferId {
    self.bottom
  }

  pub fn left(&self) -> BufferId {
    self.left
  }

  pub fn top(&self) -> BufferId {
    self.top
  }

  pub fn label(&self) -> &str {
    &self.label
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn assert_close(x1: Scalar, x2: Scalar) {
    assert!((x1 - x2).abs() < 1e-6, "{} != {}", x1, x2);
  }

  fn fixture(target: usize) -> (BufferArena, BufferId, BufferId, MultiplyAccumulate) {
    let mut arena = BufferArena::new();
    let left = arena.alloc(1, "left");
    let top = arena.alloc(1, "top");
    let ma = MultiplyAccumulate::new(&mut arena, left, top, target, "ma");
    (arena, left, top, ma)
  }

  fn feed_pair(arena: &mut BufferArena, left: BufferId, top: BufferId, a: Scalar, b: Scalar) {
    arena[left].set(Some(Word::scalar(a))).unwrap();
    arena[top].set(Some(Word::scalar(b))).unwrap();
  }

  #[test]
  fn test_ma() {
    let (mut arena, left, top, mut ma) = fixture(2);

    feed_pair(&mut arena, left, top, 2.0, 3.0);
    ma.consume(&mut arena);
    ma.emit(&mut arena).unwrap();
    assert_close(ma.accumulator(), 6.0);

    feed_pair(&mut arena, left, top, 1.0, 5.0);
    ma.consume(&mut arena);
    ma.emit(&mut arena).unwrap();
    assert_close(ma.accumulator(), 11.0);
    assert!(ma.finished());

    ma.reset();
    assert_close(ma.accumulator(), 0.0);
    assert_eq!(ma.steps(), 0);
    assert_eq!(ma.target(), 2);
  }

  #[test]
  fn test_requests_only_empty_inputs() {
    let (mut arena, left, top, mut ma) = fixture(1);
    arena[left].set(Some(Word::scalar(1.0))).unwrap();

    ma.consume(&mut arena);
    assert_eq!(ma.steps(), 0);
    assert!(!arena[left].request_open());
    assert!(arena[top].request_open());
    assert!(arena[left].is_full());
  }

  #[test]
  fn test_requests_after_drain() {
    let (mut arena, left, top, mut ma) = fixture(3);
    feed_pair(&mut arena, left, top, 1.0, 1.0);

    ma.consume(&mut arena);
    assert!(arena[left].request_open());
    assert!(arena[top].request_open());
  }

  #[test]
  fn test_finished_cell_does_not_accumulate() {
    let (mut arena, left, top, mut ma) = fixture(1);
    feed_pair(&mut arena, left, top, 2.0, 2.0);
    ma.consume(&mut arena);
    assert!(ma.finished());

    feed_pair(&mut arena, left, top, 9.0, 9.0);
    ma.consume(&mut arena);
    assert_close(ma.accumulator(), 4.0);
    assert_eq!(ma.steps(), 1);
    assert!(arena[left].is_full());
  }

  #[test]
  fn test_zero_target_is_finished() {
    let (_, _, _, ma) = fixture(0);
    assert!(ma.finished());
  }

  #[test]
  fn test_pass_through_on_request() {
    let (mut arena, left, top, mut ma) = fixture(2);
    feed_pair(&mut arena, left, top, 3.0, 4.0);
    ma.consume(&mut arena);

    // nobody asked yet
    ma.emit(&mut arena).unwrap();
    assert!(arena[ma.right()].is_empty());
    assert!(arena[ma.bottom()].is_empty());

    arena[ma.right()].open_request();
    ma.emit(&mut arena).unwrap();
    assert_eq!(arena[ma.right()].get(), Some(Word::scalar(3.0)));
    assert!(!arena[ma.right()].request_open());
    assert!(arena[ma.bottom()].is_empty());

    arena[ma.bottom()].open_request();
    ma.emit(&mut arena).unwrap();
    assert_eq!(arena[ma.bottom()].get(), Some(Word::scalar(4.0)));
  }

  #[test]
  fn test_cached_value_forwarded_once() {
    let (mut arena, left, top, mut ma) = fixture(2);
    feed_pair(&mut arena, left, top, 3.0, 4.0);
    ma.consume(&mut arena);

    arena[ma.right()].open_request();
    ma.emit(&mut arena).unwrap();
    arena[ma.right()].get();

    arena[ma.right()].open_request();
    ma.emit(&mut arena).unwrap();
    assert!(arena[ma.right()].is_empty());
    assert!(arena[ma.right()].request_open());
  }
}
