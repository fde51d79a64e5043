use std::collections::HashMap;

use super::{check_index, check_row_load, column_counts, Node, Row, SparseMatrix};
use crate::error::{LinearError, Result};

/// Keeps only the nonempty rows, keyed by row index.
///
/// Suited to very tall matrices where most rows hold nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedMatrix {
    rows: usize,
    cols: usize,
    data: HashMap<usize, Vec<Node>>,
    nnz: usize,
    sequential: bool,
    next_row: usize,
}

impl KeyedMatrix {
    /// Creates an empty `rows` x `cols` matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        KeyedMatrix {
            rows,
            cols,
            data: HashMap::new(),
            nnz: 0,
            sequential: false,
            next_row: 0,
        }
    }
}

impl SparseMatrix for KeyedMatrix {
    fn row_count(&self) -> usize {
        self.rows
    }

    fn col_count(&self) -> usize {
        self.cols
    }

    fn nnz(&self) -> usize {
        self.nnz
    }

    fn row(&self, row: usize) -> Row<'_> {
        assert!(row < self.rows, "row {row} out of range");
        self.data.get(&row).map_or(Row::EMPTY, |nodes| Row::Nodes(nodes))
    }

    fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        check_index(self.rows, self.cols, row, col)?;
        if value == 0.0 {
            if let Some(nodes) = self.data.get_mut(&row) {
                if let Ok(pos) = nodes.binary_search_by(|node| node.index.cmp(&col)) {
                    nodes.remove(pos);
                    self.nnz -= 1;
                    if nodes.is_empty() {
                        self.data.remove(&row);
                    }
                }
            }
            return Ok(());
        }
        let nodes = self.data.entry(row).or_default();
        match nodes.binary_search_by(|node| node.index.cmp(&col)) {
            Ok(pos) => nodes[pos].value = value,
            Err(pos) => {
                nodes.insert(pos, Node::new(col, value));
                self.nnz += 1;
            }
        }
        Ok(())
    }

    fn load_row(&mut self, row: usize, cols: &[usize], values: &[f64]) -> Result<()> {
        let added = check_row_load(self.rows, self.cols, row, cols, values)?;
        if self.data.contains_key(&row) || (self.sequential && row < self.next_row) {
            return Err(LinearError::RowOccupied { row });
        }
        if self.sequential {
            self.next_row = row + 1;
        }
        if added == 0 {
            return Ok(());
        }
        let nodes: Vec<Node> = cols
            .iter()
            .zip(values)
            .filter(|&(_, &v)| v != 0.0)
            .map(|(&j, &v)| Node::new(j, v))
            .collect();
        self.data.insert(row, nodes);
        self.nnz += added;
        Ok(())
    }

    fn map_row(&mut self, row: usize, f: &mut dyn FnMut(usize, f64) -> f64) -> Result<()> {
        check_index(self.rows, self.cols, row, 0)?;
        if let Some(nodes) = self.data.get_mut(&row) {
            let before = nodes.len();
            for node in nodes.iter_mut() {
                node.value = f(node.index, node.value);
            }
            nodes.retain(|node| node.value != 0.0);
            self.nnz -= before - nodes.len();
            if nodes.is_empty() {
                self.data.remove(&row);
            }
        }
        Ok(())
    }

    fn sequential_load(&self) -> bool {
        self.sequential
    }

    fn set_sequential_load(&mut self, on: bool) -> Result<()> {
        if on && !self.sequential {
            self.next_row = self.data.keys().max().map_or(0, |&r| r + 1);
        }
        self.sequential = on;
        Ok(())
    }

    fn transpose(&self) -> Box<dyn SparseMatrix> {
        let counts = column_counts(self);
        let mut data: HashMap<usize, Vec<Node>> = counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .map(|(j, &c)| (j, Vec::with_capacity(c)))
            .collect();
        let mut keys: Vec<usize> = self.data.keys().copied().collect();
        keys.sort_unstable();
        for i in keys {
            for (j, v) in self.row(i) {
                if let Some(nodes) = data.get_mut(&j) {
                    nodes.push(Node::new(i, v));
                }
            }
        }
        Box::new(KeyedMatrix {
            rows: self.cols,
            cols: self.rows,
            data,
            nnz: self.nnz,
            sequential: false,
            next_row: 0,
        })
    }
}
