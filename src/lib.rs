pub mod arch;
pub mod error;
pub mod matrix;
pub mod model;
pub mod simulator;

pub use arch::systolic::{Scalar, SystolicArray};
pub use error::{Result, SimError};
pub use matrix::DenseMatrix;
pub use simulator::sim::mode::{SimConfig, StepMode};
