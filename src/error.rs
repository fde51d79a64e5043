//! Error type shared by matrix operations, validation and training.

/// Errors returned by rulinear operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LinearError {
    /// A training parameter failed validation.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A cell access fell outside the matrix shape.
    #[error("index ({row}, {col}) out of bounds for {rows}x{cols} matrix")]
    IndexOutOfBounds {
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
        /// Number of rows of the matrix.
        rows: usize,
        /// Number of columns of the matrix.
        cols: usize,
    },

    /// Columns handed to a bulk row load were not strictly increasing.
    #[error("columns of row {row} are not strictly increasing")]
    UnsortedRow {
        /// Row being loaded.
        row: usize,
    },

    /// A bulk load targeted a row that already holds entries.
    #[error("row {row} is already populated")]
    RowOccupied {
        /// Row being loaded.
        row: usize,
    },

    /// Two shapes that have to agree did not.
    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch {
        /// Expected extent.
        expected: usize,
        /// Actual extent.
        found: usize,
    },

    /// A mutating operation was called on a read-only view.
    #[error("{0} is unsupported on a read-only view")]
    ReadOnly(&'static str),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LinearError>;
