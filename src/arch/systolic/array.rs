// Systolic Array Implementation for Matrix Multiplication
// Operands are pulled in from the left and top edges through request/grant
// handshakes; partial sums stay in place inside each MA cell.

use super::buffer::{BufferArena, BufferId};
use super::cell::{Cell, Edge};
use super::feed::SourceFeed;
use super::mac::MultiplyAccumulate;
use crate::error::{Result, SimError};
use crate::matrix::DenseMatrix;

/// Which edge bank an operation addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
  Left,
  Top,
}

// ===========================================
// Systolic Array Main Module
// ===========================================

/// R x C mesh of multiply-accumulate cells between R left feeds and C top feeds
#[derive(Debug, Clone)]
pub struct SystolicArray {
  /// Number of rows (left-edge sources)
  rows: usize,
  /// Number of columns (top-edge sources)
  cols: usize,
  /// Every channel in the mesh
  arena: BufferArena,
  /// Traversal order: MA cells row-major, then left edges, then top edges
  cells: Vec<Cell>,
  /// Ticks performed since construction or the last reset
  ticks: u64,
  /// Per-run cap that turns a stalled run into an error
  tick_limit: Option<u64>,
}

impl SystolicArray {
  /// Create an array with fresh, empty source feeds on both edges
  ///
  /// # Arguments
  /// * `rows` - Number of left feeds
  /// * `cols` - Number of top feeds
  pub fn new(rows: usize, cols: usize) -> Self {
    let mut arena = BufferArena::new();
    let left = (0..rows)
      .map(|i| Edge::from(SourceFeed::new(&mut arena, format!("left[{}]", i))))
      .collect();
    let top = (0..cols)
      .map(|j| Edge::from(SourceFeed::new(&mut arena, format!("top[{}]", j))))
      .collect();
    Self::wire(arena, left, top)
  }

  /// Build an array from feeds already allocated in `arena`
  pub fn from_feeds(arena: BufferArena, left: Vec<SourceFeed>, top: Vec<SourceFeed>) -> Self {
    let left = left.into_iter().map(Edge::from).collect();
    let top = top.into_iter().map(Edge::from).collect();
    Self::wire(arena, left, top)
  }

  /// Build an array from arbitrary edge sources. Every edge must drive a single-lane buffer.
  pub fn from_edges(arena: BufferArena, left: Vec<Edge>, top: Vec<Edge>) -> Result<Self> {
    for edge in left.iter().chain(top.iter()) {
      let width = arena[edge.output()].width();
      if width != 1 {
        return Err(SimError::SizeMismatch {
          expected: 1,
          actual: width,
        });
      }
    }
    Ok(Self::wire(arena, left, top))
  }

  /// Single row-major pass producing the nearest-neighbor mesh: each new cell
  /// takes over the row's current left buffer and the column's current top buffer.
  fn wire(mut arena: BufferArena, left: Vec<Edge>, top: Vec<Edge>) -> Self {
    let rows = left.len();
    let cols = top.len();
    let mut current_left: Vec<BufferId> = left.iter().map(Edge::output).collect();
    let mut current_top: Vec<BufferId> = top.iter().map(Edge::output).collect();

    let mut cells = Vec::with_capacity(rows * cols + rows + cols);
    for i in 0..rows {
      for j in 0..cols {
        let mac = MultiplyAccumulate::new(&mut arena, current_left[i], current_top[j], 0, format!("ma[{}][{}]", i, j));
        current_left[i] = mac.right();
        current_top[j] = mac.bottom();
        cells.push(Cell::Mac(mac));
      }
    }
    cells.extend(left.into_iter().map(Cell::from));
    cells.extend(top.into_iter().map(Cell::from));

    log::debug!("wired {}x{} systolic array with {} buffers", rows, cols, arena.len());

    Self {
      rows,
      cols,
      arena,
      cells,
      ticks: 0,
      tick_limit: None,
    }
  }

  // -------------------------------------------
  // Loading
  // -------------------------------------------

  /// Load the left feeds: column `i` of `matrix` feeds row `i` of the array
  pub fn load_left(&mut self, matrix: &DenseMatrix) -> Result<()> {
    self.load_bank(Side::Left, matrix)
  }

  /// Load the top feeds: column `j` of `matrix` feeds column `j` of the array
  pub fn load_top(&mut self, matrix: &DenseMatrix) -> Result<()> {
    self.load_bank(Side::Top, matrix)
  }

  fn load_bank(&mut self, side: Side, matrix: &DenseMatrix) -> Result<()> {
    let (start, count, context) = match side {
      Side::Left => (self.rows * self.cols, self.rows, "left feed count"),
      Side::Top => (self.rows * self.cols + self.rows, self.cols, "top feed count"),
    };
    if matrix.cols() != count {
      return Err(SimError::shape(context, count, matrix.cols()));
    }

    let bank = &mut self.cells[start..start + count];
    if let Some(index) = bank.iter().position(|cell| !matches!(cell, Cell::Feed(_))) {
      return Err(SimError::NotLoadable { index });
    }
    for (k, cell) in bank.iter_mut().enumerate() {
      if let Some(feed) = cell.as_feed_mut() {
        feed.load_from(&matrix.column(k));
      }
    }
    Ok(())
  }

  // -------------------------------------------
  // Simulation
  // -------------------------------------------

  /// Advance the array by one clock tick
  ///
  /// # Timing Constraints
  /// Each tick has two phases, and every consume happens before any emit:
  /// 1. Consume: every unfinished cell drains full inputs and requests empty ones
  /// 2. Emit: every cell serves the requests that are open on its outputs
  ///
  /// # Returns
  /// False without doing anything once no MA cell is left unfinished
  pub fn step(&mut self) -> Result<bool> {
    if !self.cells.iter().any(Cell::blocks_completion) {
      return Ok(false);
    }

    for cell in self.cells.iter_mut() {
      if !cell.finished() {
        cell.consume(&mut self.arena);
      }
    }
    for cell in self.cells.iter_mut() {
      cell.emit(&mut self.arena)?;
    }

    self.ticks += 1;
    log::trace!("tick {} done", self.ticks);
    Ok(true)
  }

  /// Step until every MA cell is finished
  ///
  /// Constant-store edges never finish and never block completion; only MA
  /// cells are waited for.
  ///
  /// # Returns
  /// Ticks performed by this run
  pub fn run(&mut self) -> Result<u64> {
    self.run_with(|_| {})
  }

  /// Like [`run`](Self::run), calling `on_tick` with the array after every tick
  pub fn run_with<F: FnMut(&Self)>(&mut self, mut on_tick: F) -> Result<u64> {
    let start = self.ticks;
    while self.step()? {
      on_tick(self);
      let elapsed = self.ticks - start;
      if let Some(limit) = self.tick_limit {
        if elapsed >= limit && self.cells.iter().any(Cell::blocks_completion) {
          log::warn!("systolic array stalled after {} ticks", elapsed);
          return Err(SimError::Stalled { ticks: elapsed });
        }
      }
    }

    let elapsed = self.ticks - start;
    log::debug!("{}x{} array quiescent after {} ticks", self.rows, self.cols, elapsed);
    Ok(elapsed)
  }

  /// Reset every MA cell and give it `target` accumulations, without stepping
  pub fn arm(&mut self, target: usize) {
    for mac in self.macs_mut() {
      mac.reset();
      mac.set_target(target);
    }
  }

  /// Reset every MA cell, give it `target` accumulations, then run
  pub fn run_ma_driven(&mut self, target: usize) -> Result<u64> {
    self.arm(target);
    self.run()
  }

  /// Multiply `left` (R x K) by `top` (K x C) on the array
  ///
  /// # Returns
  /// The R x C accumulator grid after the run
  pub fn matmul(&mut self, left: &DenseMatrix, top: &DenseMatrix) -> Result<DenseMatrix> {
    if left.rows() != self.rows {
      return Err(SimError::shape("left operand rows", self.rows, left.rows()));
    }
    if top.cols() != self.cols {
      return Err(SimError::shape("top operand columns", self.cols, top.cols()));
    }
    if left.cols() != top.rows() {
      return Err(SimError::shape("inner dimension", left.cols(), top.rows()));
    }

    self.clear_channels();
    self.load_left(&left.transpose())?;
    self.load_top(top)?;
    let ticks = self.run_ma_driven(left.cols())?;
    log::info!(
      "matmul {}x{} * {}x{} done in {} ticks",
      left.rows(),
      left.cols(),
      top.rows(),
      top.cols(),
      ticks
    );
    Ok(self.accumulator_grid())
  }

  /// Empty every buffer, close every request and drop forwarded-operand caches.
  /// Accumulators are left alone.
  pub fn clear_channels(&mut self) {
    self.arena.clear_all();
    for mac in self.macs_mut() {
      mac.drop_cached();
    }
  }

  /// Return the array to its freshly built state: channels empty, accumulators
  /// and targets zeroed, feeds rewound to the start of their loaded sequence
  pub fn reset(&mut self) {
    self.clear_channels();
    for cell in self.cells.iter_mut() {
      match cell {
        Cell::Mac(mac) => {
          mac.reset();
          mac.set_target(0);
        }
        Cell::Feed(feed) => feed.rewind(),
        Cell::Ram(_) => {}
      }
    }
    self.ticks = 0;
  }

  // -------------------------------------------
  // Observation
  // -------------------------------------------

  /// Snapshot of every accumulator; entry (i, j) belongs to cell (i, j)
  pub fn accumulator_grid(&self) -> DenseMatrix {
    let mut grid = DenseMatrix::new(self.rows, self.cols);
    for (idx, mac) in self.macs().enumerate() {
      grid.set(idx / self.cols, idx % self.cols, mac.accumulator());
    }
    grid
  }

  /// Accumulations performed by each cell, row-major
  pub fn step_grid(&self) -> Vec<Vec<usize>> {
    (0..self.rows)
      .map(|i| (0..self.cols).filter_map(|j| self.mac(i, j).map(MultiplyAccumulate::steps)).collect())
      .collect()
  }

  pub fn mac(&self, row: usize, col: usize) -> Option<&MultiplyAccumulate> {
    if row >= self.rows || col >= self.cols {
      return None;
    }
    self.cells[row * self.cols + col].as_mac()
  }

  pub fn left_edge(&self, row: usize) -> Option<&Cell> {
    if row >= self.rows {
      return None;
    }
    self.cells.get(self.rows * self.cols + row)
  }

  pub fn top_edge(&self, col: usize) -> Option<&Cell> {
    if col >= self.cols {
      return None;
    }
    self.cells.get(self.rows * self.cols + self.rows + col)
  }

  /// Whether any MA cell still has accumulations to do
  pub fn is_running(&self) -> bool {
    self.cells.iter().any(Cell::blocks_completion)
  }

  fn macs(&self) -> impl Iterator<Item = &MultiplyAccumulate> {
    self.cells.iter().filter_map(Cell::as_mac)
  }

  fn macs_mut(&mut self) -> impl Iterator<Item = &mut MultiplyAccumulate> {
    self.cells.iter_mut().filter_map(Cell::as_mac_mut)
  }

  pub fn cells(&self) -> &[Cell] {
    &self.cells
  }

  pub fn arena(&self) -> &BufferArena {
    &self.arena
  }

  pub fn ticks(&self) -> u64 {
    self.ticks
  }

  pub fn tick_limit(&self) -> Option<u64> {
    self.tick_limit
  }

  /// Cap the ticks a single `run` may take; `None` lets a stalled run spin forever
  pub fn set_tick_limit(&mut self, limit: Option<u64>) {
    self.tick_limit = limit;
  }

  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn cols(&self) -> usize {
    self.cols
  }
}

// ===========================================
// Unit Tests
// ===========================================
