//! Error types shared by every stage of a Berreman computation.

use thiserror::Error;

/// Errors raised while building or evaluating a structure.
///
/// All errors are local to the evaluation or configuration step that raised
/// them. Nothing is retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BerremanError {
    #[error("singular matrix: {0}")]
    SingularMatrix(&'static str),

    #[error("eigen-decomposition of the Delta matrix failed: {0}")]
    EigenDecomposition(String),

    #[error("propagator method '{0}' is not available")]
    UnsupportedPropagator(String),

    #[error("slice evaluation '{0}' is not available")]
    UnsupportedEvaluation(String),

    #[error("{evaluation} slice evaluation cannot be used with the {method} propagator")]
    IncompatibleMethods {
        evaluation: &'static str,
        method: &'static str,
    },

    #[error("the material is not isotropic")]
    NotIsotropic,

    #[error("invalid discretization: {0}")]
    InvalidDiscretization(String),

    #[error("invalid repetition: before={before}, after={after} with a period of {period} layers")]
    InvalidRepetition {
        before: usize,
        after: usize,
        period: usize,
    },

    #[error("invalid dispersion table: {0}")]
    InvalidTable(String),

    #[error("unknown coefficient '{0}'")]
    UnknownCoefficient(String),

    #[error("power transmission is undefined for an anisotropic exit medium")]
    PowerTransmissionUndefined,

    #[error("the result set is empty")]
    EmptyResultSet,

    #[error("row of {got} evaluations does not match the row length {expected}")]
    RaggedResultSet { expected: usize, got: usize },

    #[error("{len} evaluations cannot be laid out as {shape:?}")]
    ShapeMismatch { len: usize, shape: Vec<usize> },
}

pub type Result<T> = std::result::Result<T, BerremanError>;
