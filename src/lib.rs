//! Train linear classification and regression models.
//!
//! Features live in row-sparse matrices ([`matrix`]) wrapped into a
//! [`Problem`]. A [`Trainer`] turns a problem and a [`Parameter`] into a
//! [`Model`], runs cross-validation and searches for a good cost parameter.
#![warn(missing_docs)]

pub mod cd;
pub mod classes;
pub mod cross_validation;
pub mod error;
pub mod matrix;
pub mod model;
pub mod objective;
pub mod parameter;
mod predict;
pub mod problem;
pub mod random;
pub mod search;
pub mod train;
pub mod tron;

mod status;
pub use crate::status::{Status, StatusCode};

pub use crate::cross_validation::CrossValidation;
pub use crate::error::{LinearError, Result};
pub use crate::matrix::{MatrixKind, Node, Row, SparseMatrix};
pub use crate::model::Model;
pub use crate::parameter::{Parameter, SolverType};
pub use crate::problem::Problem;
pub use crate::random::DEFAULT_SEED;
pub use crate::search::SearchResult;
pub use crate::train::Trainer;
