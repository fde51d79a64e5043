//! Row-sparse matrices holding the training features
//!
//! All backends implement [`SparseMatrix`] and can be used interchangeably by
//! the solvers. Columns are zero based, absent entries read as zero and storing
//! a zero deletes the entry.
use serde::{Deserialize, Serialize};

use crate::error::{LinearError, Result};

mod compressed;
mod keyed;
mod nodes;
mod permuted;
mod row;
mod rows;

pub use compressed::CompressedMatrix;
pub use keyed::KeyedMatrix;
pub use nodes::NodeMatrix;
pub use permuted::PermutedMatrix;
pub use row::{Node, Row, RowIter};
pub use rows::RowsMatrix;

/// Storage layout of a [`SparseMatrix`] backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatrixKind {
    /// Compressed rows with parallel index/value arrays ([`CompressedMatrix`]).
    #[default]
    Compressed,
    /// Compressed rows with one array of nodes ([`NodeMatrix`]).
    Nodes,
    /// One growable node array per row ([`RowsMatrix`]).
    Rows,
    /// Nonempty rows kept in a map ([`KeyedMatrix`]).
    Keyed,
}

/// Common interface of row-sparse matrices.
pub trait SparseMatrix {
    /// Number of rows.
    fn row_count(&self) -> usize;
    /// Number of columns.
    fn col_count(&self) -> usize;
    /// Number of stored (nonzero) entries.
    fn nnz(&self) -> usize;

    /// Returns a view of the stored entries of `row`.
    ///
    /// Panics if `row` is out of range.
    fn row(&self, row: usize) -> Row<'_>;

    /// Reads the entry at (`row`, `col`).
    fn get(&self, row: usize, col: usize) -> Result<f64> {
        check_index(self.row_count(), self.col_count(), row, col)?;
        Ok(self.row(row).get(col))
    }

    /// Writes the entry at (`row`, `col`); a zero removes it.
    fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()>;

    /// Fills the empty row `row` from columns `cols` (strictly increasing) and `values`.
    ///
    /// Zero values are skipped. In sequential-load mode rows have to arrive in
    /// increasing order, otherwise the target row has to be empty.
    fn load_row(&mut self, row: usize, cols: &[usize], values: &[f64]) -> Result<()>;

    /// Copies row `from_row` of `from` into the empty row `to_row`.
    fn copy_row(&mut self, to_row: usize, from: &dyn SparseMatrix, from_row: usize) -> Result<()> {
        if from.col_count() != self.col_count() {
            return Err(LinearError::ShapeMismatch {
                expected: self.col_count(),
                found: from.col_count(),
            });
        }
        if from_row >= from.row_count() {
            return Err(LinearError::IndexOutOfBounds {
                row: from_row,
                col: 0,
                rows: from.row_count(),
                cols: from.col_count(),
            });
        }
        let (cols, values): (Vec<usize>, Vec<f64>) = from.row(from_row).iter().unzip();
        self.load_row(to_row, &cols, &values)
    }

    /// Replaces every stored value `v` at column `j` of `row` by `f(j, v)`.
    ///
    /// Entries mapped to zero are removed.
    fn map_row(&mut self, row: usize, f: &mut dyn FnMut(usize, f64) -> f64) -> Result<()>;

    /// Checks whether sequential-load mode is active.
    fn sequential_load(&self) -> bool;

    /// Switches sequential-load mode on or off.
    fn set_sequential_load(&mut self, on: bool) -> Result<()>;

    /// Returns the transposed matrix.
    fn transpose(&self) -> Box<dyn SparseMatrix>;

    /// Inner product of `row` with the dense vector `v`.
    fn dot(&self, row: usize, v: &[f64]) -> f64 {
        self.row(row).dot(v)
    }

    /// Adds `a` times `row` onto the dense accumulator `y`.
    fn axpy(&self, a: f64, row: usize, y: &mut [f64]) {
        self.row(row).axpy(a, y)
    }

    /// Squared Euclidean norm of `row`.
    fn squared_norm(&self, row: usize) -> f64 {
        self.row(row).squared_norm()
    }
}

/// Creates an empty `rows` x `cols` matrix of the given kind.
pub fn create(kind: MatrixKind, rows: usize, cols: usize) -> Box<dyn SparseMatrix> {
    create_with_capacity(kind, rows, cols, 0)
}

/// Creates an empty matrix reserving room for `nnz` entries where the layout allows it.
pub fn create_with_capacity(
    kind: MatrixKind,
    rows: usize,
    cols: usize,
    nnz: usize,
) -> Box<dyn SparseMatrix> {
    match kind {
        MatrixKind::Compressed => Box::new(CompressedMatrix::with_capacity(rows, cols, nnz)),
        MatrixKind::Nodes => Box::new(NodeMatrix::with_capacity(rows, cols, nnz)),
        MatrixKind::Rows => Box::new(RowsMatrix::new(rows, cols)),
        MatrixKind::Keyed => Box::new(KeyedMatrix::new(rows, cols)),
    }
}

pub(crate) fn check_index(rows: usize, cols: usize, row: usize, col: usize) -> Result<()> {
    if row >= rows || col >= cols {
        return Err(LinearError::IndexOutOfBounds {
            row,
            col,
            rows,
            cols,
        });
    }
    Ok(())
}

/// Validates the arguments of a bulk row load and counts its nonzero values.
pub(crate) fn check_row_load(
    rows: usize,
    cols: usize,
    row: usize,
    idx: &[usize],
    values: &[f64],
) -> Result<usize> {
    if idx.len() != values.len() {
        return Err(LinearError::ShapeMismatch {
            expected: idx.len(),
            found: values.len(),
        });
    }
    if row >= rows {
        return Err(LinearError::IndexOutOfBounds {
            row,
            col: 0,
            rows,
            cols,
        });
    }
    if let Some(&last) = idx.last() {
        check_index(rows, cols, row, last)?;
    }
    if idx.windows(2).any(|w| w[0] >= w[1]) {
        return Err(LinearError::UnsortedRow { row });
    }
    Ok(values.iter().filter(|&&v| v != 0.0).count())
}

/// Counts the stored entries per column.
pub(crate) fn column_counts<M: SparseMatrix + ?Sized>(m: &M) -> Vec<usize> {
    let mut counts = vec![0; m.col_count()];
    for i in 0..m.row_count() {
        for (j, _) in m.row(i) {
            counts[j] += 1;
        }
    }
    counts
}
