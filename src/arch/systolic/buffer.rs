// Single-slot handshake channel and the arena that owns every channel in an array.

use std::ops::{Index, IndexMut};

use super::word::Word;
use crate::error::{Result, SimError};

/// Handle of a buffer inside a [`BufferArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(usize);

impl BufferId {
  pub fn index(self) -> usize {
    self.0
  }
}

/// One-value channel between a producer and a consumer.
///
/// The consumer raises `request` when it wants a value; the producer only
/// writes while a request is open and closes it once served.
#[derive(Debug, Clone)]
pub struct HandshakeBuffer {
  width: usize,
  value: Option<Word>,
  request: bool,
  label: Option<String>,
}

impl HandshakeBuffer {
  pub fn new(width: usize) -> Self {
    Self {
      width,
      value: None,
      request: false,
      label: None,
    }
  }

  pub fn with_label(width: usize, label: impl Into<String>) -> Self {
    Self {
      label: Some(label.into()),
      ..Self::new(width)
    }
  }

  /// Store a value, or clear the slot when `None` is passed.
  pub fn set(&mut self, value: Option<Word>) -> Result<()> {
    if let Some(word) = &value {
      if word.width() != self.width {
        return Err(SimError::SizeMismatch {
          expected: self.width,
          actual: word.width(),
        });
      }
    }
    self.value = value;
    Ok(())
  }

  /// Take the held value. Always leaves the slot empty.
  pub fn get(&mut self) -> Option<Word> {
    self.value.take()
  }

  pub fn is_empty(&self) -> bool {
    self.value.is_none()
  }

  pub fn is_full(&self) -> bool {
    self.value.is_some()
  }

  pub fn open_request(&mut self) {
    self.request = true;
  }

  pub fn close_request(&mut self) {
    self.request = false;
  }

  pub fn request_open(&self) -> bool {
    self.request
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn label(&self) -> Option<&str> {
    self.label.as_deref()
  }

  /// Drop the held value and any pending request
  pub fn clear(&mut self) {
    self.value = None;
    self.request = false;
  }
}

/// Owner of every buffer in a mesh, addressed by [`BufferId`]
#[derive(Debug, Clone, Default)]
pub struct BufferArena {
  buffers: Vec<HandshakeBuffer>,
}

impl BufferArena {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn alloc(&mut self, width: usize, label: impl Into<String>) -> BufferId {
    self.buffers.push(HandshakeBuffer::with_label(width, label));
    BufferId(self.buffers.len() - 1)
  }

  pub fn len(&self) -> usize {
    self.buffers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.buffers.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &HandshakeBuffer> {
    self.buffers.iter()
  }

  /// Empty every buffer and close every request
  pub fn clear_all(&mut self) {
    for buf in &mut self.buffers {
      buf.clear();
    }
  }
}

impl Index<BufferId> for BufferArena {
  type Output = HandshakeBuffer;

  fn index(&self, id: BufferId) -> &HandshakeBuffer {
    &self.buffers[id.0]
  }
}

impl IndexMut<BufferId> for BufferArena {
  fn index_mut(&mut self, id: BufferId) -> &mut HandshakeBuffer {
    &mut self.buffers[id.0]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_buffer() {
    let mut buf = HandshakeBuffer::new(2);
    assert!(buf.is_empty());

    buf.set(Some(Word::from(vec![2.0, 4.0]))).unwrap();
    assert!(buf.is_full());

    let data = buf.get().unwrap();
    assert!(buf.is_empty());
    assert_eq!(data.lane(0), Some(2.0));
    assert_eq!(data.lane(1), Some(4.0));
  }

  #[test]
  fn test_set_wrong_width() {
    let mut buf = HandshakeBuffer::new(1);
    let err = buf.set(Some(Word::from(vec![1.0, 2.0]))).unwrap_err();
    assert_eq!(
      err,
      SimError::SizeMismatch {
        expected: 1,
        actual: 2
      }
    );
    assert!(buf.is_empty());
  }

  #[test]
  fn test_get_empty_is_noop() {
    let mut buf = HandshakeBuffer::new(1);
    assert_eq!(buf.get(), None);
    assert!(buf.is_empty());
  }

  #[test]
  fn test_single_read() {
    let mut buf = HandshakeBuffer::new(1);
    buf.set(Some(Word::scalar(7.0))).unwrap();
    assert_eq!(buf.get(), Some(Word::scalar(7.0)));
    assert_eq!(buf.get(), None);
  }

  #[test]
  fn test_set_none_cancels_pending_value() {
    let mut buf = HandshakeBuffer::new(1);
    buf.set(Some(Word::scalar(1.0))).unwrap();
    buf.set(None).unwrap();
    assert!(buf.is_empty());
  }

  #[test]
  fn test_request_flag() {
    let mut arena = BufferArena::new();
    let id = arena.alloc(1, "probe");
    assert!(!arena[id].request_open());
    arena[id].open_request();
    assert!(arena[id].request_open());
    arena[id].close_request();
    assert!(!arena[id].request_open());
    assert_eq!(arena[id].label(), Some("probe"));
  }
}
