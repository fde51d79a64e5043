//! Borrowed view of a single sparse row
use serde::{Deserialize, Serialize};
use std::iter::Zip;
use std::slice::Iter;

/// A single stored feature: column `index` holding `value`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Zero-based column index.
    pub index: usize,
    /// Stored (nonzero) value.
    pub value: f64,
}

impl Node {
    /// Creates a [`Node`].
    pub fn new(index: usize, value: f64) -> Self {
        Node { index, value }
    }
}

/// Read-only view of the stored entries of one row, ordered by column.
///
/// The view is `Copy`, so iterating it does not consume it and the same row
/// can be walked any number of times.
#[derive(Debug, Clone, Copy)]
pub enum Row<'a> {
    /// Entries kept as parallel index/value slices.
    Split {
        /// Column indices.
        index: &'a [usize],
        /// Values belonging to `index`.
        value: &'a [f64],
    },
    /// Entries kept as a slice of [`Node`]s.
    Nodes(&'a [Node]),
}

impl<'a> Row<'a> {
    /// A row without any stored entry.
    pub const EMPTY: Row<'static> = Row::Nodes(&[]);

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        match self {
            Row::Split { index, .. } => index.len(),
            Row::Nodes(nodes) => nodes.len(),
        }
    }

    /// Checks whether the row stores no entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates the `(column, value)` pairs in column order.
    pub fn iter(&self) -> RowIter<'a> {
        match *self {
            Row::Split { index, value } => RowIter::Split(index.iter().zip(value.iter())),
            Row::Nodes(nodes) => RowIter::Nodes(nodes.iter()),
        }
    }

    /// Looks up the value stored at column `col` (zero if absent).
    pub fn get(&self, col: usize) -> f64 {
        match *self {
            Row::Split { index, value } => match index.binary_search(&col) {
                Ok(pos) => value[pos],
                Err(_) => 0.0,
            },
            Row::Nodes(nodes) => match nodes.binary_search_by(|node| node.index.cmp(&col)) {
                Ok(pos) => nodes[pos].value,
                Err(_) => 0.0,
            },
        }
    }

    /// Computes the inner product with the dense vector `v`.
    #[inline]
    pub fn dot(&self, v: &[f64]) -> f64 {
        let mut res = 0.0;
        match *self {
            Row::Split { index, value } => {
                for (&j, &xj) in index.iter().zip(value) {
                    res += v[j] * xj;
                }
            }
            Row::Nodes(nodes) => {
                for node in nodes {
                    res += v[node.index] * node.value;
                }
            }
        }
        res
    }

    /// Adds `a` times the row onto the dense accumulator `y`.
    #[inline]
    pub fn axpy(&self, a: f64, y: &mut [f64]) {
        match *self {
            Row::Split { index, value } => {
                for (&j, &xj) in index.iter().zip(value) {
                    y[j] += a * xj;
                }
            }
            Row::Nodes(nodes) => {
                for node in nodes {
                    y[node.index] += a * node.value;
                }
            }
        }
    }

    /// Computes the squared Euclidean norm of the row.
    #[inline]
    pub fn squared_norm(&self) -> f64 {
        match *self {
            Row::Split { value, .. } => value.iter().map(|&xj| xj * xj).sum(),
            Row::Nodes(nodes) => nodes.iter().map(|node| node.value * node.value).sum(),
        }
    }
}

impl<'a> From<&'a [Node]> for Row<'a> {
    fn from(nodes: &'a [Node]) -> Self {
        Row::Nodes(nodes)
    }
}

impl<'a> IntoIterator for Row<'a> {
    type Item = (usize, f64);
    type IntoIter = RowIter<'a>;

    fn into_iter(self) -> RowIter<'a> {
        self.iter()
    }
}

/// Iterator over the `(column, value)` pairs of a [`Row`].
#[derive(Debug, Clone)]
pub enum RowIter<'a> {
    /// Walks parallel index/value slices.
    Split(Zip<Iter<'a, usize>, Iter<'a, f64>>),
    /// Walks a node slice.
    Nodes(Iter<'a, Node>),
}

impl Iterator for RowIter<'_> {
    type Item = (usize, f64);

    fn next(&mut self) -> Option<(usize, f64)> {
        match self {
            RowIter::Split(it) => it.next().map(|(&j, &xj)| (j, xj)),
            RowIter::Nodes(it) => it.next().map(|node| (node.index, node.value)),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            RowIter::Split(it) => it.size_hint(),
            RowIter::Nodes(it) => it.size_hint(),
        }
    }
}

impl ExactSizeIterator for RowIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_and_node_rows_agree() {
        let index = [0, 3, 7];
        let value = [1.5, -2.0, 4.0];
        let nodes: Vec<Node> = index
            .iter()
            .zip(value.iter())
            .map(|(&j, &v)| Node::new(j, v))
            .collect();
        let split = Row::Split {
            index: &index,
            value: &value,
        };
        let packed = Row::from(nodes.as_slice());

        let v: Vec<f64> = (0..8).map(|j| j as f64 + 1.0).collect();
        assert_eq!(split.dot(&v), packed.dot(&v));
        assert_eq!(split.dot(&v), 1.5 * 1.0 - 2.0 * 4.0 + 4.0 * 8.0);
        assert_eq!(split.squared_norm(), packed.squared_norm());
        assert_eq!(split.get(3), -2.0);
        assert_eq!(packed.get(4), 0.0);

        let mut y1 = vec![0.0; 8];
        let mut y2 = vec![0.0; 8];
        split.axpy(2.0, &mut y1);
        packed.axpy(2.0, &mut y2);
        assert_eq!(y1, y2);
        assert_eq!(y1[7], 8.0);
    }

    #[test]
    fn row_iteration_is_restartable() {
        let nodes = [Node::new(1, 1.0), Node::new(2, 2.0)];
        let row = Row::from(&nodes[..]);
        let first: Vec<_> = row.iter().collect();
        let second: Vec<_> = row.into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(row.iter().len(), 2);
        assert!(Row::EMPTY.is_empty());
    }
}
