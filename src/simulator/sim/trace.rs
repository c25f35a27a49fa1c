use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Result, Write};
use std::path::Path;

use crate::arch::systolic::{Scalar, SystolicArray};

/// One line of the trace file: the array state after a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
  pub tick: u64,
  pub steps: Vec<Vec<usize>>,
  pub accumulators: Vec<Vec<Scalar>>,
}

impl TickRecord {
  pub fn capture(array: &SystolicArray) -> Self {
    Self {
      tick: array.ticks(),
      steps: array.step_grid(),
      accumulators: array.accumulator_grid().to_rows(),
    }
  }
}

/// Writes one JSON object per line
pub struct TraceWriter<W: Write> {
  writer: W,
  lines: u64,
}

impl TraceWriter<BufWriter<File>> {
  pub fn create(path: impl AsRef<Path>) -> Result<Self> {
    let file = File::create(path)?;
    Ok(Self::new(BufWriter::new(file)))
  }
}

impl<W: Write> TraceWriter<W> {
  pub fn new(writer: W) -> Self {
    Self { writer, lines: 0 }
  }

  pub fn record(&mut self, array: &SystolicArray) -> Result<()> {
    let entry = serde_json::to_string(&TickRecord::capture(array))?;
    writeln!(self.writer, "{}", entry)?;
    self.lines += 1;
    Ok(())
  }

  pub fn lines(&self) -> u64 {
    self.lines
  }

  pub fn flush(&mut self) -> Result<()> {
    self.writer.flush()
  }

  pub fn into_inner(self) -> W {
    self.writer
  }
}
