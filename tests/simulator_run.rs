use npu::model::{MatmulRequest, MatmulUnit, UnitDriver};
use npu::simulator::config::config::{parse_config, AppConfig};
use npu::simulator::utils::log::init_log;
use npu::simulator::Simulator;
use npu::{DenseMatrix, SimConfig, StepMode};

fn app_config(toml: &str) -> AppConfig {
  parse_config(toml).unwrap()
}

#[test]
fn test_configured_operands() {
  init_log();

  let config = app_config(
    r#"
    [simulation]
    quiet = true

    [operands]
    left = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]
    top = [[9.0, 8.0, 7.0], [6.0, 5.0, 4.0], [3.0, 2.0, 1.0]]
    "#,
  );
  let mut simulator = Simulator::from_app_config(&config).unwrap();
  assert_eq!(simulator.config().step_mode, StepMode::Continuous);

  let result = simulator.run().unwrap();
  assert_eq!(
    result.to_rows(),
    vec![
      vec![30.0, 24.0, 18.0],
      vec![84.0, 69.0, 54.0],
      vec![138.0, 114.0, 90.0],
    ]
  );
  assert_eq!(simulator.ticks(), 8);
  assert_eq!(simulator.array().step_grid(), vec![vec![3; 3]; 3]);
}

#[test]
fn test_rejects_array_shape() {
  init_log();

  let config = app_config(
    r#"
    [array]
    cols = 4

    [operands]
    left = [[1.0]]
    top = [[1.0, 2.0]]
    "#,
  );
  assert!(Simulator::from_app_config(&config).is_err());
}

#[test]
fn test_rerun_is_deterministic() {
  init_log();

  let left = DenseMatrix::from_rows(&[vec![0.5, -1.5], vec![2.0, 4.0]]).unwrap();
  let top = DenseMatrix::from_rows(&[vec![1.0, -2.0, 3.0], vec![0.25, 0.0, -1.0]]).unwrap();
  let mut simulator = Simulator::new(SimConfig::default(), left.clone(), top.clone()).unwrap();

  let first = simulator.run().unwrap();
  let second = simulator.run().unwrap();
  assert_eq!(first, second);
  assert_eq!(first, left.product(&top).unwrap());
}

#[test]
fn test_devs_unit_agrees_with_array() {
  init_log();

  let left = vec![vec![1.0, 3.0, 4.0], vec![-5.0, 0.0, 2.0]];
  let top = vec![vec![2.0, 2.0], vec![-3.0, 2.0], vec![0.0, 4.0]];

  let mut driver = UnitDriver::new(MatmulUnit::new(2, 2, "req".to_string(), "resp".to_string()));
  let resp = driver
    .submit(
      "req",
      &MatmulRequest {
        id: 3,
        left: left.clone(),
        top: top.clone(),
      },
    )
    .unwrap();

  let mut simulator = Simulator::new(
    SimConfig::default(),
    DenseMatrix::from_rows(&left).unwrap(),
    DenseMatrix::from_rows(&top).unwrap(),
  )
  .unwrap();
  let result = simulator.run().unwrap();

  assert_eq!(resp.result, result.to_rows());
  assert_eq!(resp.ticks, simulator.ticks());
}
