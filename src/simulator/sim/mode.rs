#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
  Continuous,
  Step,
}

#[derive(Debug, Clone)]
pub struct SimConfig {
  pub quiet: bool,
  pub step_mode: StepMode,
  pub trace_file: Option<String>,
  pub tick_limit: Option<u64>,
}

impl Default for SimConfig {
  fn default() -> Self {
    Self {
      quiet: false,
      step_mode: StepMode::Continuous,
      trace_file: None,
      tick_limit: None,
    }
  }
}
