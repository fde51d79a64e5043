use std::ops::Range;

use super::{check_index, check_row_load, column_counts, Node, Row, SparseMatrix};
use crate::error::{LinearError, Result};

/// Compressed sparse rows kept as one array of [`Node`]s.
///
/// Same layout as [`super::CompressedMatrix`] but index and value of an entry
/// sit next to each other.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMatrix {
    rows: usize,
    cols: usize,
    row_ptr: Vec<usize>,
    nodes: Vec<Node>,
    sequential: bool,
    next_row: usize,
}

impl NodeMatrix {
    /// Creates an empty `rows` x `cols` matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::with_capacity(rows, cols, 0)
    }

    /// Creates an empty matrix with room for `nnz` entries.
    pub fn with_capacity(rows: usize, cols: usize, nnz: usize) -> Self {
        NodeMatrix {
            rows,
            cols,
            row_ptr: vec![0; rows + 1],
            nodes: Vec::with_capacity(nnz),
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
        let nnz = self.nodes.len();
        for p in self.row_ptr[self.next_row + 1..].iter_mut() {
            *p = nnz;
        }
        self.sequential = false;
    }

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

impl SparseMatrix for NodeMatrix {
    fn row_count(&self) -> usize {
        self.rows
    }

    fn col_count(&self) -> usize {
        self.cols
    }

    fn nnz(&self) -> usize {
        self.nodes.len()
    }

    fn row(&self, row: usize) -> Row<'_> {
        assert!(row < self.rows, "row {row} out of range");
        if self.sequential && row >= self.next_row {
            return Row::EMPTY;
        }
        Row::Nodes(&self.nodes[self.span(row)])
    }

    fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        check_index(self.rows, self.cols, row, col)?;
        self.edit(|m| {
            let span = m.span(row);
            let found = m.nodes[span.clone()].binary_search_by(|node| node.index.cmp(&col));
            match found {
                Ok(pos) if value == 0.0 => {
                    m.nodes.remove(span.start + pos);
                    m.shift_after(row, 0, 1);
                }
                Ok(pos) => m.nodes[span.start + pos].value = value,
                Err(_) if value == 0.0 => {}
                Err(pos) => {
                    m.nodes.insert(span.start + pos, Node::new(col, value));
                    m.shift_after(row, 1, 0);
                }
            }
        });
        Ok(())
    }

    fn load_row(&mut self, row: usize, cols: &[usize], values: &[f64]) -> Result<()> {
        let added = check_row_load(self.rows, self.cols, row, cols, values)?;
        let entries = cols
            .iter()
            .zip(values)
            .filter(|&(_, &v)| v != 0.0)
            .map(|(&j, &v)| Node::new(j, v));
        if self.sequential {
            if row < self.next_row {
                return Err(LinearError::RowOccupied { row });
            }
            let nnz = self.nodes.len();
            for p in self.row_ptr[self.next_row..=row].iter_mut() {
                *p = nnz;
            }
            self.nodes.extend(entries);
            self.row_ptr[row + 1] = self.nodes.len();
            self.next_row = row + 1;
            return Ok(());
        }
        let span = self.span(row);
        if !span.is_empty() {
            return Err(LinearError::RowOccupied { row });
        }
        self.nodes.splice(span.start..span.start, entries);
        self.shift_after(row, added, 0);
        Ok(())
    }

    fn map_row(&mut self, row: usize, f: &mut dyn FnMut(usize, f64) -> f64) -> Result<()> {
        check_index(self.rows, self.cols, row, 0)?;
        self.edit(|m| {
            let span = m.span(row);
            let kept: Vec<Node> = m.nodes[span.clone()]
                .iter()
                .map(|node| Node::new(node.index, f(node.index, node.value)))
                .filter(|node| node.value != 0.0)
                .collect();
            let removed = span.len() - kept.len();
            m.nodes.splice(span, kept);
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
        let counts = column_counts(self);
        let mut row_ptr = vec![0; self.cols + 1];
        for j in 0..self.cols {
            row_ptr[j + 1] = row_ptr[j] + counts[j];
        }
        let mut nodes = vec![Node::new(0, 0.0); row_ptr[self.cols]];
        let mut fill = row_ptr[..self.cols].to_vec();
        for i in 0..self.rows {
            for (j, v) in self.row(i) {
                nodes[fill[j]] = Node::new(i, v);
                fill[j] += 1;
            }
        }
        Box::new(NodeMatrix {
            rows: self.cols,
            cols: self.rows,
            row_ptr,
            nodes,
            sequential: false,
            next_row: 0,
        })
    }
}
