use super::{check_index, check_row_load, column_counts, Node, Row, SparseMatrix};
use crate::error::{LinearError, Result};

/// One growable node array per row; cheap to mutate in any order.
#[derive(Debug, Clone, PartialEq)]
pub struct RowsMatrix {
    cols: usize,
    data: Vec<Vec<Node>>,
    nnz: usize,
    sequential: bool,
    // in sequential mode rows below next_row are closed
    next_row: usize,
}

impl RowsMatrix {
    /// Creates an empty `rows` x `cols` matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        RowsMatrix {
            cols,
            data: vec![Vec::new(); rows],
            nnz: 0,
            sequential: false,
            next_row: 0,
        }
    }
}

impl SparseMatrix for RowsMatrix {
    fn row_count(&self) -> usize {
        self.data.len()
    }

    fn col_count(&self) -> usize {
        self.cols
    }

    fn nnz(&self) -> usize {
        self.nnz
    }

    fn row(&self, row: usize) -> Row<'_> {
        Row::Nodes(&self.data[row])
    }

    fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        check_index(self.data.len(), self.cols, row, col)?;
        let nodes = &mut self.data[row];
        match nodes.binary_search_by(|node| node.index.cmp(&col)) {
            Ok(pos) if value == 0.0 => {
                nodes.remove(pos);
                self.nnz -= 1;
            }
            Ok(pos) => nodes[pos].value = value,
            Err(_) if value == 0.0 => {}
            Err(pos) => {
                nodes.insert(pos, Node::new(col, value));
                self.nnz += 1;
            }
        }
        Ok(())
    }

    fn load_row(&mut self, row: usize, cols: &[usize], values: &[f64]) -> Result<()> {
        let added = check_row_load(self.data.len(), self.cols, row, cols, values)?;
        if !self.data[row].is_empty() || (self.sequential && row < self.next_row) {
            return Err(LinearError::RowOccupied { row });
        }
        let mut nodes = Vec::with_capacity(added);
        for (&j, &v) in cols.iter().zip(values) {
            if v != 0.0 {
                nodes.push(Node::new(j, v));
            }
        }
        self.data[row] = nodes;
        self.nnz += added;
        if self.sequential {
            self.next_row = row + 1;
        }
        Ok(())
    }

    fn map_row(&mut self, row: usize, f: &mut dyn FnMut(usize, f64) -> f64) -> Result<()> {
        check_index(self.data.len(), self.cols, row, 0)?;
        let nodes = &mut self.data[row];
        let before = nodes.len();
        for node in nodes.iter_mut() {
            node.value = f(node.index, node.value);
        }
        nodes.retain(|node| node.value != 0.0);
        self.nnz -= before - nodes.len();
        Ok(())
    }

    fn sequential_load(&self) -> bool {
        self.sequential
    }

    fn set_sequential_load(&mut self, on: bool) -> Result<()> {
        if on && !self.sequential {
            self.next_row = self
                .data
                .iter()
                .rposition(|nodes| !nodes.is_empty())
                .map_or(0, |r| r + 1);
        }
        self.sequential = on;
        Ok(())
    }

    fn transpose(&self) -> Box<dyn SparseMatrix> {
        let data = column_counts(self)
            .into_iter()
            .map(Vec::with_capacity)
            .collect::<Vec<Vec<Node>>>();
        let mut t = RowsMatrix {
            cols: self.data.len(),
            data,
            nnz: self.nnz,
            sequential: false,
            next_row: 0,
        };
        for (i, nodes) in self.data.iter().enumerate() {
            for node in nodes {
                t.data[node.index].push(Node::new(i, node.value));
            }
        }
        Box::new(t)
    }
}
