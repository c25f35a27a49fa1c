use clap::Parser;
use npu::model::{MatmulRequest, MatmulUnit, UnitDriver};
use npu::simulator::config::config::{apply_cli_overrides, dump_config, validate_config, OperandSection};
use npu::simulator::config::load_config;
use npu::simulator::utils::log::{init_log, set_quiet};
use npu::simulator::utils::report::{print_matmul_report, print_model_records};
use npu::simulator::Simulator;
use std::io;
use std::path::PathBuf;

/// npu - cycle-level systolic MAC array simulator
#[derive(Parser, Debug)]
#[command(name = "npu")]
#[command(version = "0.1.0")]
#[command(about = "Cycle-level systolic array matrix multiply simulator", long_about = None)]
struct Args {
  /// TOML configuration file layered over the built-in defaults
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Enable step mode (interactive stepping)
  #[arg(short, long)]
  step: bool,

  /// Quiet mode (suppress log messages)
  #[arg(short, long)]
  quiet: bool,

  /// Output trace file path
  #[arg(long, value_name = "FILE")]
  trace_file: Option<String>,

  /// Give up after this many ticks (0 = unlimited)
  #[arg(long, value_name = "TICKS")]
  tick_limit: Option<u64>,

  /// Print the effective configuration and exit
  #[arg(long)]
  dump_config: bool,

  /// Run the operands through the discrete-event matmul unit instead
  #[arg(long)]
  devs: bool,
}

fn main() -> io::Result<()> {
  init_log();

  let args = Args::parse();

  let mut config = load_config(args.config.as_deref())?;
  apply_cli_overrides(
    &mut config,
    args.quiet,
    args.step,
    args.trace_file.as_deref(),
    args.tick_limit,
  );
  set_quiet(config.simulation.quiet);

  if args.dump_config {
    print!("{}", dump_config(&config)?);
    return Ok(());
  }

  if args.devs {
    return run_devs(config);
  }

  let mut simulator = Simulator::from_app_config(&config)?;
  let result = simulator.run()?;
  print_matmul_report(simulator.left(), simulator.top(), &result, simulator.ticks());
  Ok(())
}

fn run_devs(mut config: npu::simulator::config::AppConfig) -> io::Result<()> {
  if config.operands.is_empty() {
    config.operands = OperandSection::demo();
  }
  validate_config(&config)?;

  let unit = MatmulUnit::new(config.rows(), config.cols(), "req".to_string(), "resp".to_string())
    .with_tick_limit(config.tick_limit());
  let mut driver = UnitDriver::new(unit);

  let req = MatmulRequest {
    id: 0,
    left: config.operands.left.clone(),
    top: config.operands.top.clone(),
  };
  let resp = driver
    .submit("req", &req)
    .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Simulation error: {:?}", e)))?;

  print_model_records("matmul_unit", driver.unit());
  print_matmul_report(
    &config.left_matrix()?,
    &config.top_matrix()?,
    &npu::DenseMatrix::from_rows(&resp.result)?,
    resp.ticks,
  );
  Ok(())
}
