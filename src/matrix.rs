//! Dense row-major matrix used to stage operands and read results back.

use std::ops::{Index, IndexMut, Range};

use serde::{Deserialize, Serialize};

use crate::arch::systolic::word::Scalar;
use crate::error::{Result, SimError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseMatrix {
  rows: usize,
  cols: usize,
  data: Vec<Scalar>,
}

impl DenseMatrix {
  /// Zero-filled `rows` x `cols` matrix
  pub fn new(rows: usize, cols: usize) -> Self {
    Self {
      rows,
      cols,
      data: vec![0.0; rows * cols],
    }
  }

  /// Build a matrix from a list of rows. Every row must have the same length.
  pub fn from_rows(rowdata: &[Vec<Scalar>]) -> Result<Self> {
    let rows = rowdata.len();
    let cols = rowdata.first().map_or(0, |r| r.len());
    let mut data = Vec::with_capacity(rows * cols);
    for row in rowdata {
      if row.len() != cols {
        return Err(SimError::shape("nonuniform row length", cols, row.len()));
      }
      data.extend_from_slice(row);
    }
    Ok(Self { rows, cols, data })
  }

  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn cols(&self) -> usize {
    self.cols
  }

  pub fn get(&self, r: usize, c: usize) -> Option<Scalar> {
    if r < self.rows && c < self.cols {
      Some(self.data[r * self.cols + c])
    } else {
      None
    }
  }

  pub fn set(&mut self, r: usize, c: usize, value: Scalar) {
    self[(r, c)] = value;
  }

  /// Part of column `c`, rows `r`
  pub fn column_slice(&self, r: Range<usize>, c: usize) -> Vec<Scalar> {
    r.map(|ir| self[(ir, c)]).collect()
  }

  /// Part of row `r`, columns `c`
  pub fn row_slice(&self, r: usize, c: Range<usize>) -> Vec<Scalar> {
    self.data[r * self.cols + c.start..r * self.cols + c.end].to_vec()
  }

  pub fn column(&self, c: usize) -> Vec<Scalar> {
    self.column_slice(0..self.rows, c)
  }

  pub fn row(&self, r: usize) -> Vec<Scalar> {
    self.row_slice(r, 0..self.cols)
  }

  pub fn to_rows(&self) -> Vec<Vec<Scalar>> {
    (0..self.rows).map(|r| self.row(r)).collect()
  }

  pub fn transpose(&self) -> Self {
    let mut out = Self::new(self.cols, self.rows);
    for r in 0..self.rows {
      for c in 0..self.cols {
        out[(c, r)] = self[(r, c)];
      }
    }
    out
  }

  pub fn map(&self, f: impl Fn(Scalar) -> Scalar) -> Self {
    Self {
      rows: self.rows,
      cols: self.cols,
      data: self.data.iter().map(|&x| f(x)).collect(),
    }
  }

  pub fn sum(&self) -> Scalar {
    self.data.iter().sum()
  }

  /// Elements in row-major order
  pub fn iter(&self) -> impl Iterator<Item = &Scalar> {
    self.data.iter()
  }

  pub fn try_add(&self, other: &Self) -> Result<Self> {
    self.zip_with(other, |a, b| a + b)
  }

  pub fn try_sub(&self, other: &Self) -> Result<Self> {
    self.zip_with(other, |a, b| a - b)
  }

  fn zip_with(&self, other: &Self, f: impl Fn(Scalar, Scalar) -> Scalar) -> Result<Self> {
    if self.rows != other.rows {
      return Err(SimError::shape("row count", self.rows, other.rows));
    }
    if self.cols != other.cols {
      return Err(SimError::shape("column count", self.cols, other.cols));
    }
    Ok(Self {
      rows: self.rows,
      cols: self.cols,
      data: self.data.iter().zip(&other.data).map(|(&a, &b)| f(a, b)).collect(),
    })
  }

  /// Reference product computed directly, used to check array results
  pub fn product(&self, other: &Self) -> Result<Self> {
    if self.cols != other.rows {
      return Err(SimError::shape("inner dimension", self.cols, other.rows));
    }
    let mut out = Self::new(self.rows, other.cols);
    for i in 0..self.rows {
      for j in 0..other.cols {
        out[(i, j)] = (0..self.cols).map(|k| self[(i, k)] * other[(k, j)]).sum();
      }
    }
    Ok(out)
  }

  /// Largest absolute elementwise difference
  pub fn max_abs_diff(&self, other: &Self) -> Result<Scalar> {
    Ok(self.try_sub(other)?.iter().fold(0.0, |m: Scalar, x| m.max(x.abs())))
  }
}

impl Index<(usize, usize)> for DenseMatrix {
  type Output = Scalar;

  fn index(&self, (r, c): (usize, usize)) -> &Scalar {
    assert!(r < self.rows && c < self.cols, "index ({}, {}) out of bounds", r, c);
    &self.data[r * self.cols + c]
  }
}

impl IndexMut<(usize, usize)> for DenseMatrix {
  fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut Scalar {
    assert!(r < self.rows && c < self.cols, "index ({}, {}) out of bounds", r, c);
    &mut self.data[r * self.cols + c]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_matrix() {
    let mut m = DenseMatrix::new(2, 2);
    for i in 0..2 {
      for j in 0..2 {
        assert_eq!(m[(i, j)], 0.0);
      }
    }
    m.set(0, 1, 2.0);
    assert_eq!(m[(0, 1)], 2.0);
    assert_eq!(m.get(2, 0), None);
  }

  #[test]
  fn test_matrix_init() {
    let m = DenseMatrix::from_rows(&[vec![2.0, 3.0], vec![4.0, 5.0]]).unwrap();
    assert_eq!(m[(0, 1)], 3.0);
    assert_eq!(m[(1, 0)], 4.0);
  }

  #[test]
  fn test_ragged_rows_rejected() {
    let err = DenseMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
    assert!(matches!(err, SimError::ShapeMismatch { expected: 2, actual: 1, .. }));
  }

  #[test]
  fn test_matrix_slice() {
    let m = DenseMatrix::from_rows(&[vec![2.0, 3.0], vec![4.0, 5.0]]).unwrap();
    assert_eq!(m.column_slice(0..2, 1), vec![3.0, 5.0]);
    assert_eq!(m.row_slice(0, 1..2), vec![3.0]);
    assert_eq!(m.transpose().to_rows(), vec![vec![2.0, 4.0], vec![3.0, 5.0]]);
  }

  #[test]
  fn test_elementwise() {
    let a = DenseMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    let b = a.map(|x| x * 2.0);
    assert_eq!(b.sum(), 20.0);
    assert_eq!(b.try_sub(&a).unwrap(), a);
    assert_eq!(a.try_add(&a).unwrap(), b);
    assert!(a.try_add(&DenseMatrix::new(1, 2)).is_err());
  }

  #[test]
  fn test_product() {
    let a = DenseMatrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
    let b = DenseMatrix::from_rows(&[vec![7.0, 8.0], vec![9.0, 10.0], vec![11.0, 12.0]]).unwrap();
    let c = a.product(&b).unwrap();
    assert_eq!(c.to_rows(), vec![vec![58.0, 64.0], vec![139.0, 154.0]]);
    assert!(a.product(&a).is_err());
  }
}
