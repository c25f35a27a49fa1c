pub mod config;
pub mod sim;
pub mod simulator;
pub mod utils;

// provide to the npu binary
pub use simulator::Simulator;
pub use utils::log;
