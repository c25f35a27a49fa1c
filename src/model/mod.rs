pub mod driver;
pub mod matmul_unit;

pub use driver::UnitDriver;
pub use matmul_unit::{MatmulRequest, MatmulResponse, MatmulUnit};

/// Push a ModelRecord stamped with the current simulation time
///
/// Usage:
/// ```ignore
/// model_record!(self, services, "action_name", "subject string");
/// model_record!(self, services, "action_name", format!("formatted {}", value));
/// ```
#[macro_export]
macro_rules! model_record {
  ($self:expr, $services:expr, $action:expr, $subject:expr) => {
    $self.records.push(sim::models::ModelRecord {
      time: $services.global_time(),
      action: $action.to_string(),
      subject: $subject.to_string(),
    });
  };
}
