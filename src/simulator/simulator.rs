use super::config::config::{validate_config, OperandSection};
use super::config::AppConfig;
use super::sim::mode::{SimConfig, StepMode};
use super::sim::shell::{Command, Shell};
use super::sim::trace::TraceWriter;
use super::utils::report::format_grid;
use crate::arch::systolic::SystolicArray;
use crate::matrix::DenseMatrix;
use std::fs::File;
use std::io::{self, BufWriter, Result};

/// Runs one matrix multiplication on a systolic array, continuously or from
/// the interactive shell
pub struct Simulator {
  config: SimConfig,
  array: SystolicArray,
  left: DenseMatrix,
  top: DenseMatrix,
  trace: Option<TraceWriter<BufWriter<File>>>,
}

impl Simulator {
  pub fn new(config: SimConfig, left: DenseMatrix, top: DenseMatrix) -> Result<Self> {
    if left.cols() != top.rows() {
      return Err(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!(
          "cannot multiply {}x{} by {}x{}",
          left.rows(),
          left.cols(),
          top.rows(),
          top.cols()
        ),
      ));
    }

    let mut array = SystolicArray::new(left.rows(), top.cols());
    array.set_tick_limit(config.tick_limit);

    let trace = match &config.trace_file {
      Some(path) => {
        log::info!("writing tick trace to {}", path);
        Some(TraceWriter::create(path)?)
      }
      None => None,
    };

    Ok(Self {
      config,
      array,
      left,
      top,
      trace,
    })
  }

  /// Build from the layered application config; empty operands fall back to the demo pair
  pub fn from_app_config(app: &AppConfig) -> Result<Self> {
    let mut app = app.clone();
    if app.operands.is_empty() {
      log::info!("no operands configured, using the built-in demo");
      app.operands = OperandSection::demo();
    }
    validate_config(&app)?;

    let config = SimConfig {
      quiet: app.simulation.quiet,
      step_mode: if app.simulation.step_mode {
        StepMode::Step
      } else {
        StepMode::Continuous
      },
      trace_file: match app.simulation.trace_file.as_str() {
        "" => None,
        path => Some(path.to_string()),
      },
      tick_limit: app.tick_limit(),
    };
    Self::new(config, app.left_matrix()?, app.top_matrix()?)
  }

  /// Load the operands, run, and return the accumulator grid
  pub fn run(&mut self) -> Result<DenseMatrix> {
    self.prepare()?;
    match self.config.step_mode {
      StepMode::Continuous => self.run_continuous()?,
      StepMode::Step => self.run_step_mode()?,
    }
    if let Some(trace) = self.trace.as_mut() {
      trace.flush()?;
    }
    Ok(self.array.accumulator_grid())
  }

  fn prepare(&mut self) -> Result<()> {
    self.array.clear_channels();
    self.array.load_left(&self.left.transpose())?;
    self.array.load_top(&self.top)?;
    self.array.arm(self.left.cols());
    Ok(())
  }

  fn run_continuous(&mut self) -> Result<()> {
    let trace = &mut self.trace;
    let mut trace_err = None;
    let ticks = self.array.run_with(|array| {
      if let Some(writer) = trace.as_mut() {
        if let Err(e) = writer.record(array) {
          trace_err.get_or_insert(e);
        }
      }
    })?;
    if let Some(e) = trace_err {
      return Err(e);
    }
    log::debug!("continuous run finished after {} ticks", ticks);
    Ok(())
  }

  fn run_step_mode(&mut self) -> Result<()> {
    println!("Step mode - Enter steps one tick, 'si N' steps N, 'p' prints, 'c' continues, 'q' quits\n");
    let mut shell = Shell::new()?;

    while self.array.is_running() {
      match shell.read_command()? {
        Command::Step(n) => {
          for _ in 0..n {
            if !self.tick()? {
              break;
            }
          }
          self.print_state();
        }
        Command::Print => self.print_state(),
        Command::Continue => self.run_continuous()?,
        Command::Quit => {
          log::warn!("quit with {} MA cells still running", self.unfinished());
          break;
        }
      }
    }
    Ok(())
  }

  fn tick(&mut self) -> Result<bool> {
    let advanced = self.array.step()?;
    if advanced {
      if let Some(writer) = self.trace.as_mut() {
        writer.record(&self.array)?;
      }
    }
    Ok(advanced)
  }

  fn unfinished(&self) -> usize {
    self.array.cells().iter().filter(|c| c.blocks_completion()).count()
  }

  fn print_state(&self) {
    println!("tick {} ({} MA cells running)", self.array.ticks(), self.unfinished());
    print!("{}", format_grid(&self.array.accumulator_grid()));
  }

  pub fn array(&self) -> &SystolicArray {
    &self.array
  }

  pub fn left(&self) -> &DenseMatrix {
    &self.left
  }

  pub fn top(&self) -> &DenseMatrix {
    &self.top
  }

  pub fn config(&self) -> &SimConfig {
    &self.config
  }

  pub fn ticks(&self) -> u64 {
    self.array.ticks()
  }
}
