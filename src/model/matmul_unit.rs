// Discrete-event wrapper around the systolic array: a matmul request arrives on
// the request port and the result leaves the response port one simulated time
// unit per array tick later.

use serde::{Deserialize, Serialize};
use sim::models::model_trait::{DevsModel, Reportable, ReportableModel, SerializableModel};
use sim::models::{ModelMessage, ModelRecord};
use sim::simulator::Services;
use sim::utils::errors::SimulationError;
use std::f64::INFINITY;

use crate::arch::systolic::{Scalar, SystolicArray};
use crate::matrix::DenseMatrix;
use crate::model_record;

/// Operands of one matrix multiplication, as row lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatmulRequest {
  pub id: u64,
  pub left: Vec<Vec<Scalar>>,
  pub top: Vec<Vec<Scalar>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatmulResponse {
  pub id: u64,
  pub result: Vec<Vec<Scalar>>,
  pub ticks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum UnitState {
  Idle,
  Computing,
}

#[derive(Debug, Clone)]
pub struct MatmulUnit {
  // Port names for communication
  req_port: String,
  resp_port: String,

  array: SystolicArray,
  state: UnitState,
  pending: Option<MatmulResponse>,

  until_next_event: f64,
  records: Vec<ModelRecord>,
}

impl MatmulUnit {
  pub fn new(rows: usize, cols: usize, req_port: String, resp_port: String) -> Self {
    Self {
      req_port,
      resp_port,
      array: SystolicArray::new(rows, cols),
      state: UnitState::Idle,
      pending: None,
      until_next_event: INFINITY,
      records: Vec::new(),
    }
  }

  /// Cap each multiplication so a malformed request cannot spin forever
  pub fn with_tick_limit(mut self, limit: Option<u64>) -> Self {
    self.array.set_tick_limit(limit);
    self
  }

  pub fn is_idle(&self) -> bool {
    self.state == UnitState::Idle
  }

  fn compute(&mut self, req: MatmulRequest) -> Result<MatmulResponse, String> {
    let left = DenseMatrix::from_rows(&req.left).map_err(|e| e.to_string())?;
    let top = DenseMatrix::from_rows(&req.top).map_err(|e| e.to_string())?;
    let before = self.array.ticks();
    let result = self.array.matmul(&left, &top).map_err(|e| e.to_string())?;
    Ok(MatmulResponse {
      id: req.id,
      result: result.to_rows(),
      ticks: self.array.ticks() - before,
    })
  }
}

impl DevsModel for MatmulUnit {
  fn events_ext(&mut self, incoming_message: &ModelMessage, services: &mut Services) -> Result<(), SimulationError> {
    if incoming_message.port_name != self.req_port {
      return Ok(());
    }

    if self.state != UnitState::Idle {
      model_record!(self, services, "reject_busy", incoming_message.content);
      return Err(SimulationError::InvalidModelState);
    }

    let req: MatmulRequest =
      serde_json::from_str(&incoming_message.content).map_err(|_| SimulationError::InvalidModelState)?;
    let id = req.id;
    model_record!(
      self,
      services,
      "receive_inst",
      format!("matmul #{} on {}x{} array", id, self.array.rows(), self.array.cols())
    );

    match self.compute(req) {
      Ok(resp) => {
        self.until_next_event = resp.ticks as f64;
        self.pending = Some(resp);
        self.state = UnitState::Computing;
        Ok(())
      }
      Err(reason) => {
        log::error!("matmul #{} rejected: {}", id, reason);
        model_record!(self, services, "reject_shape", reason);
        Err(SimulationError::InvalidModelState)
      }
    }
  }

  fn events_int(&mut self, services: &mut Services) -> Result<Vec<ModelMessage>, SimulationError> {
    self.state = UnitState::Idle;
    self.until_next_event = INFINITY;

    let Some(resp) = self.pending.take() else {
      return Ok(Vec::new());
    };

    model_record!(
      self,
      services,
      "compute_complete",
      format!("matmul #{} completed in {} ticks", resp.id, resp.ticks)
    );

    Ok(vec![ModelMessage {
      port_name: self.resp_port.clone(),
      content: serde_json::to_string(&resp).map_err(|_| SimulationError::InvalidModelState)?,
    }])
  }

  fn until_next_event(&self) -> f64 {
    self.until_next_event
  }

  fn time_advance(&mut self, time_delta: f64) {
    self.until_next_event -= time_delta;
  }
}

impl ReportableModel for MatmulUnit {}

impl Reportable for MatmulUnit {
  fn status(&self) -> String {
    match self.state {
      UnitState::Idle => "idle".to_string(),
      UnitState::Computing => "computing".to_string(),
    }
  }

  fn records(&self) -> &Vec<ModelRecord> {
    &self.records
  }
}

impl SerializableModel for MatmulUnit {
  fn get_type(&self) -> &'static str {
    "MatmulUnit"
  }
}
