use super::buffer::{BufferArena, BufferId};
use super::feed::SourceFeed;
use super::mac::MultiplyAccumulate;
use super::ram::ConstantStore;
use crate::error::Result;

/// Every element the array schedules, dispatched by variant
#[derive(Debug, Clone)]
pub enum Cell {
  Feed(SourceFeed),
  Mac(MultiplyAccumulate),
  Ram(ConstantStore),
}

impl Cell {
  pub fn consume(&mut self, arena: &mut BufferArena) {
    match self {
      Cell::Feed(feed) => feed.consume(arena),
      Cell::Mac(mac) => mac.consume(arena),
      Cell::Ram(ram) => ram.consume(arena),
    }
  }

  pub fn emit(&mut self, arena: &mut BufferArena) -> Result<()> {
    match self {
      Cell::Feed(feed) => feed.emit(arena),
      Cell::Mac(mac) => mac.emit(arena),
      Cell::Ram(ram) => ram.emit(arena),
    }
  }

  pub fn finished(&self) -> bool {
    match self {
      Cell::Feed(feed) => feed.finished(),
      Cell::Mac(mac) => mac.finished(),
      Cell::Ram(ram) => ram.finished(),
    }
  }

  /// Only compute cells hold the run loop open
  pub fn blocks_completion(&self) -> bool {
    matches!(self, Cell::Mac(mac) if !mac.finished())
  }

  pub fn label(&self) -> &str {
    match self {
      Cell::Feed(feed) => feed.label(),
      Cell::Mac(mac) => mac.label(),
      Cell::Ram(ram) => ram.label(),
    }
  }

  pub fn as_mac(&self) -> Option<&MultiplyAccumulate> {
    match self {
      Cell::Mac(mac) => Some(mac),
      _ => None,
    }
  }

  pub fn as_mac_mut(&mut self) -> Option<&mut MultiplyAccumulate> {
    match self {
      Cell::Mac(mac) => Some(mac),
      _ => None,
    }
  }

  pub fn as_feed_mut(&mut self) -> Option<&mut SourceFeed> {
    match self {
      Cell::Feed(feed) => Some(feed),
      _ => None,
    }
  }
}

/// A source that can sit on the left or top edge of an array
#[derive(Debug, Clone)]
pub enum Edge {
  Feed(SourceFeed),
  Ram(ConstantStore),
}

impl Edge {
  /// Buffer the first cell of the row or column reads from
  pub fn output(&self) -> BufferId {
    match self {
      Edge::Feed(feed) => feed.output(),
      Edge::Ram(ram) => ram.output(),
    }
  }
}

impl From<Edge> for Cell {
  fn from(edge: Edge) -> Self {
    match edge {
      Edge::Feed(feed) => Cell::Feed(feed),
      Edge::Ram(ram) => Cell::Ram(ram),
    }
  }
}

impl From<SourceFeed> for Edge {
  fn from(feed: SourceFeed) -> Self {
    Edge::Feed(feed)
  }
}

impl From<ConstantStore> for Edge {
  fn from(ram: ConstantStore) -> Self {
    Edge::Ram(ram)
  }
}

impl From<SourceFeed> for Cell {
  fn from(feed: SourceFeed) -> Self {
    Cell::Feed(feed)
  }
}

impl From<MultiplyAccumulate> for Cell {
  fn from(mac: MultiplyAccumulate) -> Self {
    Cell::Mac(mac)
  }
}

impl From<ConstantStore> for Cell {
  fn from(ram: ConstantStore) -> Self {
    Cell::Ram(ram)
  }
}
