use sim::models::model_trait::Reportable;

use crate::matrix::DenseMatrix;

/// Render a matrix one row per line, right aligned
pub fn format_grid(matrix: &DenseMatrix) -> String {
  let cells: Vec<Vec<String>> = matrix
    .to_rows()
    .iter()
    .map(|row| row.iter().map(|v| format!("{}", v)).collect())
    .collect();
  let width = cells.iter().flatten().map(String::len).max().unwrap_or(1);

  let mut out = String::new();
  for row in &cells {
    let line: Vec<String> = row.iter().map(|s| format!("{:>width$}", s, width = width)).collect();
    out.push_str("  [");
    out.push_str(&line.join(", "));
    out.push_str("]\n");
  }
  out
}

pub fn print_matmul_report(left: &DenseMatrix, top: &DenseMatrix, result: &DenseMatrix, ticks: u64) {
  println!("\n--- Matmul Report ---");
  println!(
    "{}x{} * {}x{} on a {}x{} array, {} ticks",
    left.rows(),
    left.cols(),
    top.rows(),
    top.cols(),
    result.rows(),
    result.cols(),
    ticks
  );
  print!("{}", format_grid(result));

  match left.product(top).and_then(|expected| result.max_abs_diff(&expected)) {
    Ok(diff) => println!("max |array - reference| = {:e}", diff),
    Err(e) => println!("reference check skipped: {}", e),
  }
  println!("--- End Report ---\n");
}

pub fn print_model_records(name: &str, model: &dyn Reportable) {
  let records = model.records();
  if records.is_empty() {
    return;
  }
  println!("\n[{}] {}", name, model.status());
  for record in records {
    println!("  Time {:.1}: {} {}", record.time, record.action, record.subject);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_format_grid_aligns() {
    let m = DenseMatrix::from_rows(&[vec![-7.0, 24.0], vec![-10.0, -2.0]]).unwrap();
    assert_eq!(format_grid(&m), "  [ -7,  24]\n  [-10,  -2]\n");
  }

  #[test]
  fn test_format_empty_grid() {
    assert_eq!(format_grid(&DenseMatrix::new(0, 0)), "");
  }
}
