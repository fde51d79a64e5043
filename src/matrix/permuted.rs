use super::{check_index, CompressedMatrix, Row, SparseMatrix};
use crate::error::{LinearError, Result};

/// Read-only view presenting the rows `rows[0], rows[1], ...` of a base matrix.
///
/// Rows may be repeated or left out, nothing is copied. All mutating
/// operations fail with [`LinearError::ReadOnly`].
pub struct PermutedMatrix<'a> {
    base: &'a dyn SparseMatrix,
    rows: Vec<usize>,
}

impl<'a> PermutedMatrix<'a> {
    /// Creates the view; every entry of `rows` has to be a row of `base`.
    pub fn new(base: &'a dyn SparseMatrix, rows: Vec<usize>) -> Result<Self> {
        if let Some(&bad) = rows.iter().find(|&&r| r >= base.row_count()) {
            return Err(LinearError::IndexOutOfBounds {
                row: bad,
                col: 0,
                rows: base.row_count(),
                cols: base.col_count(),
            });
        }
        Ok(PermutedMatrix { base, rows })
    }

    /// Row of the base matrix behind view row `row`.
    pub fn base_row(&self, row: usize) -> usize {
        self.rows[row]
    }
}

impl SparseMatrix for PermutedMatrix<'_> {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn col_count(&self) -> usize {
        self.base.col_count()
    }

    fn nnz(&self) -> usize {
        self.rows.iter().map(|&r| self.base.row(r).len()).sum()
    }

    fn row(&self, row: usize) -> Row<'_> {
        self.base.row(self.rows[row])
    }

    fn get(&self, row: usize, col: usize) -> Result<f64> {
        check_index(self.rows.len(), self.base.col_count(), row, col)?;
        self.base.get(self.rows[row], col)
    }

    fn set(&mut self, _row: usize, _col: usize, _value: f64) -> Result<()> {
        Err(LinearError::ReadOnly("set"))
    }

    fn load_row(&mut self, _row: usize, _cols: &[usize], _values: &[f64]) -> Result<()> {
        Err(LinearError::ReadOnly("load_row"))
    }

    fn copy_row(&mut self, _to: usize, _from: &dyn SparseMatrix, _from_row: usize) -> Result<()> {
        Err(LinearError::ReadOnly("copy_row"))
    }

    fn map_row(&mut self, _row: usize, _f: &mut dyn FnMut(usize, f64) -> f64) -> Result<()> {
        Err(LinearError::ReadOnly("map_row"))
    }

    fn sequential_load(&self) -> bool {
        self.base.sequential_load()
    }

    fn set_sequential_load(&mut self, _on: bool) -> Result<()> {
        Err(LinearError::ReadOnly("set_sequential_load"))
    }

    fn transpose(&self) -> Box<dyn SparseMatrix> {
        Box::new(CompressedMatrix::transposed(self))
    }

    fn dot(&self, row: usize, v: &[f64]) -> f64 {
        self.base.dot(self.rows[row], v)
    }

    fn axpy(&self, a: f64, row: usize, y: &mut [f64]) {
        self.base.axpy(a, self.rows[row], y)
    }

    fn squared_norm(&self, row: usize) -> f64 {
        self.base.squared_norm(self.rows[row])
    }
}
