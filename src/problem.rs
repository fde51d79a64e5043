//! Training set: targets, sparse features and the optional bias column
use ndarray::{ArrayView1, ArrayView2};

use crate::error::{LinearError, Result};
use crate::matrix::{self, MatrixKind, Node, PermutedMatrix, SparseMatrix};

/// A training set of `l` instances with `n` features.
///
/// When `bias >= 0` the last feature column holds `bias` on every row and is
/// counted in `n`. The features may be owned or a view borrowing the rows of
/// another problem.
pub struct Problem<'a> {
    y: Vec<f64>,
    x: Box<dyn SparseMatrix + 'a>,
    bias: f64,
}

impl<'a> Problem<'a> {
    /// Creates a [`Problem`] from targets and an already populated matrix.
    pub fn new(y: Vec<f64>, x: Box<dyn SparseMatrix + 'a>, bias: f64) -> Result<Self> {
        if y.len() != x.row_count() {
            return Err(LinearError::ShapeMismatch {
                expected: x.row_count(),
                found: y.len(),
            });
        }
        Ok(Problem { y, x, bias })
    }

    /// Number of instances.
    pub fn l(&self) -> usize {
        self.y.len()
    }

    /// Number of features (including the bias column).
    pub fn n(&self) -> usize {
        self.x.col_count()
    }

    /// Labels or regression targets.
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Feature matrix.
    pub fn x(&self) -> &dyn SparseMatrix {
        self.x.as_ref()
    }

    /// Bias value (negative if there is no bias column).
    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Returns the `n x l` transposed feature matrix.
    pub fn transpose(&self) -> Box<dyn SparseMatrix> {
        self.x.transpose()
    }

    /// Views the rows `rows` of this problem with new targets `y`.
    pub fn view(&self, rows: Vec<usize>, y: Vec<f64>) -> Result<Problem<'_>> {
        let x = PermutedMatrix::new(self.x.as_ref(), rows)?;
        Problem::new(y, Box::new(x), self.bias)
    }

    /// Views the rows `rows` of this problem, keeping their targets.
    pub fn subset(&self, rows: Vec<usize>) -> Result<Problem<'_>> {
        let y = rows
            .iter()
            .map(|&i| self.y.get(i).copied())
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| LinearError::ShapeMismatch {
                expected: self.l(),
                found: rows.iter().max().map_or(0, |&i| i + 1),
            })?;
        self.view(rows, y)
    }
}

impl Problem<'static> {
    /// Builds a problem from rows of sorted [`Node`]s with indices below `n_features`.
    ///
    /// A column `n_features` holding `bias` is appended when `bias >= 0`.
    pub fn from_rows(
        y: Vec<f64>,
        rows: &[Vec<Node>],
        n_features: usize,
        bias: f64,
        kind: MatrixKind,
    ) -> Result<Self> {
        if y.len() != rows.len() {
            return Err(LinearError::ShapeMismatch {
                expected: rows.len(),
                found: y.len(),
            });
        }
        let has_bias = bias >= 0.0;
        let n = n_features + usize::from(has_bias);
        let nnz = rows.iter().map(Vec::len).sum::<usize>() + if has_bias { rows.len() } else { 0 };
        let mut x = matrix::create_with_capacity(kind, rows.len(), n, nnz);
        x.set_sequential_load(true)?;
        let mut cols = Vec::new();
        let mut values = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            cols.clear();
            values.clear();
            for node in row {
                if node.index >= n_features {
                    return Err(LinearError::IndexOutOfBounds {
                        row: i,
                        col: node.index,
                        rows: rows.len(),
                        cols: n_features,
                    });
                }
                cols.push(node.index);
                values.push(node.value);
            }
            if has_bias {
                cols.push(n_features);
                values.push(bias);
            }
            x.load_row(i, &cols, &values)?;
        }
        x.set_sequential_load(false)?;
        Problem::new(y, x, bias)
    }

    /// Builds a problem from dense features, storing only the nonzero values.
    pub fn from_array(
        y: ArrayView1<f64>,
        x: ArrayView2<f64>,
        bias: f64,
        kind: MatrixKind,
    ) -> Result<Self> {
        let rows: Vec<Vec<Node>> = x
            .outer_iter()
            .map(|xi| {
                xi.iter()
                    .enumerate()
                    .filter(|&(_, &v)| v != 0.0)
                    .map(|(j, &v)| Node::new(j, v))
                    .collect()
            })
            .collect();
        Problem::from_rows(y.to_vec(), &rows, x.ncols(), bias, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn bias_column_is_appended() {
        let x = array![[1.0, 0.0], [0.0, 2.0], [0.0, 0.0]];
        let y = array![1.0, -1.0, 1.0];
        let prob = Problem::from_array(y.view(), x.view(), 1.0, MatrixKind::Compressed).unwrap();
        assert_eq!(prob.l(), 3);
        assert_eq!(prob.n(), 3);
        assert_eq!(prob.x().get(0, 2).unwrap(), 1.0);
        assert_eq!(prob.x().get(1, 1).unwrap(), 2.0);
        assert_eq!(prob.x().row(2).len(), 1);

        let t = prob.transpose();
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.row(2).len(), 3);
    }

    #[test]
    fn without_bias_nothing_is_added() {
        let rows = vec![vec![Node::new(0, 1.0)], vec![]];
        let prob = Problem::from_rows(vec![1.0, 2.0], &rows, 4, -1.0, MatrixKind::Keyed).unwrap();
        assert_eq!(prob.n(), 4);
        assert_eq!(prob.x().nnz(), 1);
    }

    #[test]
    fn shape_errors() {
        let rows = vec![vec![Node::new(5, 1.0)]];
        assert!(matches!(
            Problem::from_rows(vec![1.0], &rows, 4, -1.0, MatrixKind::Rows),
            Err(LinearError::IndexOutOfBounds { col: 5, .. })
        ));
        assert!(matches!(
            Problem::from_rows(vec![1.0, 1.0], &rows, 6, -1.0, MatrixKind::Rows),
            Err(LinearError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn subset_copies_targets() {
        let rows = vec![vec![Node::new(0, 1.0)], vec![Node::new(1, 2.0)], vec![]];
        let prob =
            Problem::from_rows(vec![1.0, 2.0, 3.0], &rows, 2, -1.0, MatrixKind::Nodes).unwrap();
        let sub = prob.subset(vec![2, 0]).unwrap();
        assert_eq!(sub.y(), &[3.0, 1.0]);
        assert_eq!(sub.x().get(1, 0).unwrap(), 1.0);
        assert!(prob.subset(vec![3]).is_err());
    }
}
