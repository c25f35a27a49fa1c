use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

use crate::arch::systolic::Scalar;
use crate::matrix::DenseMatrix;

/// Configuration shipped with the binary
pub const DEFAULT_CONFIG: &str = include_str!("default.toml");

/// Simulation section
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationSection {
  #[serde(default)]
  pub quiet: bool,
  #[serde(default)]
  pub step_mode: bool,
  #[serde(default)]
  pub trace_file: String,
  #[serde(default = "default_tick_limit")]
  pub tick_limit: u64,
}

fn default_tick_limit() -> u64 {
  100_000
}

impl Default for SimulationSection {
  fn default() -> Self {
    Self {
      quiet: false,
      step_mode: false,
      trace_file: String::new(),
      tick_limit: default_tick_limit(),
    }
  }
}

/// Array dimensions; 0 means "take it from the operands"
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ArraySection {
  #[serde(default)]
  pub rows: usize,
  #[serde(default)]
  pub cols: usize,
}

/// Operand matrices as row lists
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OperandSection {
  #[serde(default)]
  pub left: Vec<Vec<Scalar>>,
  #[serde(default)]
  pub top: Vec<Vec<Scalar>>,
}

impl OperandSection {
  /// 2x3 by 3x2 example used when no operands are configured
  pub fn demo() -> Self {
    Self {
      left: vec![vec![1.0, 3.0, 4.0], vec![-5.0, 0.0, 2.0]],
      top: vec![vec![2.0, 2.0], vec![-3.0, 2.0], vec![0.0, 4.0]],
    }
  }

  pub fn is_empty(&self) -> bool {
    self.left.is_empty() && self.top.is_empty()
  }
}

/// Unified application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
  #[serde(default)]
  pub simulation: SimulationSection,
  #[serde(default)]
  pub array: ArraySection,
  #[serde(default)]
  pub operands: OperandSection,
}

impl AppConfig {
  pub fn left_matrix(&self) -> io::Result<DenseMatrix> {
    DenseMatrix::from_rows(&self.operands.left).map_err(|e| invalid(format!("operands.left: {}", e)))
  }

  pub fn top_matrix(&self) -> io::Result<DenseMatrix> {
    DenseMatrix::from_rows(&self.operands.top).map_err(|e| invalid(format!("operands.top: {}", e)))
  }

  /// Array rows, derived from the left operand when unset
  pub fn rows(&self) -> usize {
    if self.array.rows != 0 {
      self.array.rows
    } else {
      self.operands.left.len()
    }
  }

  /// Array columns, derived from the top operand when unset
  pub fn cols(&self) -> usize {
    if self.array.cols != 0 {
      self.array.cols
    } else {
      self.operands.top.first().map_or(0, |r| r.len())
    }
  }

  pub fn tick_limit(&self) -> Option<u64> {
    match self.simulation.tick_limit {
      0 => None,
      n => Some(n),
    }
  }
}

fn invalid(msg: String) -> io::Error {
  io::Error::new(io::ErrorKind::InvalidData, msg)
}

/// Load the layered configuration: built-in defaults, then `path` if given,
/// then `NPU_<SECTION>__<KEY>` environment variables.
pub fn load_config(path: Option<&Path>) -> io::Result<AppConfig> {
  let mut builder = Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

  if let Some(path) = path {
    if !path.exists() {
      return Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("cannot read config file {:?}", path),
      ));
    }
    builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
  }

  builder = builder.add_source(Environment::with_prefix("NPU").separator("__"));

  builder
    .build()
    .and_then(|cfg| cfg.try_deserialize::<AppConfig>())
    .map_err(|e| invalid(format!("failed to load configuration: {}", e)))
}

/// Parse a configuration from a TOML string, without layering
pub fn parse_config(content: &str) -> io::Result<AppConfig> {
  toml::from_str::<AppConfig>(content).map_err(|e| invalid(format!("failed to parse TOML config: {}", e)))
}

/// Render the effective configuration as TOML
pub fn dump_config(config: &AppConfig) -> io::Result<String> {
  toml::to_string_pretty(config).map_err(|e| invalid(format!("failed to serialize config: {}", e)))
}

/// Apply CLI overrides on top of the loaded configuration
pub fn apply_cli_overrides(config: &mut AppConfig, quiet: bool, step: bool, trace_file: Option<&str>, tick_limit: Option<u64>) {
  if quiet {
    config.simulation.quiet = true;
  }
  if step {
    config.simulation.step_mode = true;
  }
  if let Some(file) = trace_file {
    config.simulation.trace_file = file.to_string();
  }
  if let Some(limit) = tick_limit {
    config.simulation.tick_limit = limit;
  }
}

/// Validate operand shapes against each other and the array dimensions
pub fn validate_config(config: &AppConfig) -> io::Result<()> {
  let left = config.left_matrix()?;
  let top = config.top_matrix()?;

  if left.cols() != top.rows() {
    return Err(invalid(format!(
      "inner dimension mismatch: left operand has {} columns, top operand has {} rows",
      left.cols(),
      top.rows()
    )));
  }

  if config.rows() != left.rows() {
    return Err(invalid(format!(
      "array has {} rows but the left operand has {}",
      config.rows(),
      left.rows()
    )));
  }

  if config.cols() != top.cols() {
    return Err(invalid(format!(
      "array has {} columns but the top operand has {}",
      config.cols(),
      top.cols()
    )));
  }

  Ok(())
}
