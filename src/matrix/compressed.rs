use std::ops::Range;

use super::{check_index, check_row_load, column_counts, Row, SparseMatrix};
use crate::error::{LinearError, Result};

/// Compressed sparse rows kept as parallel column-index and value arrays.
///
/// Reads are cheap, inserting into an interior row shifts all later entries.
/// Bulk construction should go through [`SparseMatrix::load_row`] in
/// sequential-load mode, which only appends.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedMatrix {
    rows: usize,
    cols: usize,
    row_ptr: Vec<usize>,
    index: Vec<usize>,
    value: Vec<f64>,
    sequential: bool,
    // in sequential mode row_ptr is only valid up to next_row
    next_row: usize,
}

impl CompressedMatrix {
    /// Creates an empty `rows` x `cols` matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::with_capacity(rows, cols, 0)
    }

    /// Creates an empty matrix with room for `nnz` entries.
    pub fn with_capacity(rows: usize, cols: usize, nnz: usize) -> Self {
        CompressedMatrix {
            rows,
            cols,
            row_ptr: vec![0; rows + 1],
            index: Vec::with_capacity(nnz),
            value: Vec::with_capacity(nnz),
            sequential: false,
            next_row: 0,
        }
    }

    /// Builds the transpose of any row-sparse matrix by counting and then filling columns.
    pub fn transposed<M: SparseMatrix + ?Sized>(m: &M) -> Self {
        let counts = column_counts(m);
        let cols = m.col_count();
        let mut row_ptr = vec![0; cols + 1];
        for j in 0..cols {
            row_ptr[j + 1] = row_ptr[j] + counts[j];
        }
        let nnz = row_ptr[cols];
        let mut index = vec![0; nnz];
        let mut value = vec![0.0; nnz];
        let mut fill = row_ptr[..cols].to_vec();
        for i in 0..m.row_count() {
            for (j, v) in m.row(i) {
                index[fill[j]] = i;
                value[fill[j]] = v;
                fill[j] += 1;
            }
        }
        CompressedMatrix {
            rows: cols,
            cols: m.row_count(),
            row_ptr,
            index,
            value,
            sequential: false,
            next_row: 0,
        }
    }

    fn span(&self, row: usize) -> Range<usize> {
        self.row_ptr[row]..self.row_ptr[row + 1]
    }

    fn begin_sequential(&mut self) {
        self.next_row = (0..self.rows)
            .rev()
            .find(|&r| self.row_ptr[r] < self.row_ptr[r + 1])
            .map_or(0, |r| r + 1);
        self.sequential = true;
    }

    fn end_sequential(&mut self) {
        let nnz = self.value.len();
        for p in self.row_ptr[self.next_row + 1..].iter_mut() {
            *p = nnz;
        }
        self.sequential = false;
    }

    /// Runs a structural edit with fully valid row pointers.
    fn edit<T>(&mut self, op: impl FnOnce(&mut Self) -> T) -> T {
        let resume = self.sequential;
        if resume {
            self.end_sequential();
        }
        let res = op(self);
        if resume {
            self.begin_sequential();
        }
        res
    }

    fn shift_after(&mut self, row: usize, added: usize, removed: usize) {
        for p in self.row_ptr[row + 1..].iter_mut() {
            *p = *p + added - removed;
        }
    }
}

impl SparseMatrix for CompressedMatrix {
    fn row_count(&self) -> usize {
        self.rows
    }

    fn col_count(&self) -> usize {
        self.cols
    }

    fn nnz(&self) -> usize {
        self.value.len()
    }

    fn row(&self, row: usize) -> Row<'_> {
        assert!(row < self.rows, "row {row} out of range");
        if self.sequential && row >= self.next_row {
            return Row::EMPTY;
        }
        let span = self.span(row);
        Row::Split {
            index: &self.index[span.clone()],
            value: &self.value[span],
        }
    }

    fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        check_index(self.rows, self.cols, row, col)?;
        self.edit(|m| {
            let span = m.span(row);
            match m.index[span.clone()].binary_search(&col) {
                Ok(pos) if value == 0.0 => {
                    m.index.remove(span.start + pos);
                    m.value.remove(span.start + pos);
                    m.shift_after(row, 0, 1);
                }
                Ok(pos) => m.value[span.start + pos] = value,
                Err(_) if value == 0.0 => {}
                Err(pos) => {
                    m.index.insert(span.start + pos, col);
                    m.value.insert(span.start + pos, value);
                    m.shift_after(row, 1, 0);
                }
            }
        });
        Ok(())
    }

    fn load_row(&mut self, row: usize, cols: &[usize], values: &[f64]) -> Result<()> {
        let added = check_row_load(self.rows, self.cols, row, cols, values)?;
        let entries = cols.iter().zip(values).filter(|&(_, &v)| v != 0.0);
        if self.sequential {
            if row < self.next_row {
                return Err(LinearError::RowOccupied { row });
            }
            let nnz = self.value.len();
            for p in self.row_ptr[self.next_row..=row].iter_mut() {
                *p = nnz;
            }
            for (&j, &v) in entries {
                self.index.push(j);
                self.value.push(v);
            }
            self.row_ptr[row + 1] = self.value.len();
            self.next_row = row + 1;
            return Ok(());
        }
        let span = self.span(row);
        if !span.is_empty() {
            return Err(LinearError::RowOccupied { row });
        }
        let (idx, vals): (Vec<usize>, Vec<f64>) = entries.unzip();
        self.index.splice(span.start..span.start, idx);
        self.value.splice(span.start..span.start, vals);
        self.shift_after(row, added, 0);
        Ok(())
    }

    fn map_row(&mut self, row: usize, f: &mut dyn FnMut(usize, f64) -> f64) -> Result<()> {
        check_index(self.rows, self.cols, row, 0)?;
        self.edit(|m| {
            let span = m.span(row);
            let (idx, vals): (Vec<usize>, Vec<f64>) = span
                .clone()
                .map(|p| (m.index[p], f(m.index[p], m.value[p])))
                .filter(|&(_, v)| v != 0.0)
                .unzip();
            let removed = span.len() - idx.len();
            m.index.splice(span.clone(), idx);
            m.value.splice(span, vals);
            m.shift_after(row, 0, removed);
        });
        Ok(())
    }

    fn sequential_load(&self) -> bool {
        self.sequential
    }

    fn set_sequential_load(&mut self, on: bool) -> Result<()> {
        match (self.sequential, on) {
            (false, true) => self.begin_sequential(),
            (true, false) => self.end_sequential(),
            _ => {}
        }
        Ok(())
    }

    fn transpose(&self) -> Box<dyn SparseMatrix> {
        Box::new(CompressedMatrix::transposed(self))
    }
}
