use sim::models::model_trait::DevsModel;
use sim::models::ModelMessage;
use sim::simulator::Services;
use sim::utils::errors::SimulationError;
use std::f64::INFINITY;

use super::matmul_unit::{MatmulRequest, MatmulResponse, MatmulUnit};

/// Drives a single `MatmulUnit` without a full coupled simulation
pub struct UnitDriver {
  unit: MatmulUnit,
  services: Services,
}

impl UnitDriver {
  pub fn new(unit: MatmulUnit) -> Self {
    Self {
      unit,
      services: Services::default(),
    }
  }

  pub fn send_message(&mut self, msg: &ModelMessage) -> Result<(), SimulationError> {
    self.unit.events_ext(msg, &mut self.services)
  }

  /// Advance global time to the unit's next internal event and fire it
  pub fn step(&mut self) -> Result<Vec<ModelMessage>, SimulationError> {
    let until_next_event = self.unit.until_next_event();
    if until_next_event == INFINITY {
      return Ok(Vec::new());
    }

    self.unit.time_advance(until_next_event);
    self
      .services
      .set_global_time(self.services.global_time() + until_next_event);

    if self.unit.until_next_event() <= 0.0 {
      self.unit.events_int(&mut self.services)
    } else {
      Ok(Vec::new())
    }
  }

  /// Send one request on `req_port` and wait for its response
  pub fn submit(&mut self, req_port: &str, req: &MatmulRequest) -> Result<MatmulResponse, SimulationError> {
    let msg = ModelMessage {
      port_name: req_port.to_string(),
      content: serde_json::to_string(req).map_err(|_| SimulationError::InvalidModelState)?,
    };
    self.send_message(&msg)?;

    let out = self.step()?;
    let reply = out.first().ok_or(SimulationError::InvalidModelState)?;
    serde_json::from_str(&reply.content).map_err(|_| SimulationError::InvalidModelState)
  }

  pub fn global_time(&self) -> f64 {
    self.services.global_time()
  }

  pub fn unit(&self) -> &MatmulUnit {
    &self.unit
  }
}
