use thiserror::Error;

/// Failures surfaced by model fitting, prediction and the data plumbing around them.
/// Non-convergence is not an error: it is reported through `FitReport::converged`.
#[derive(Debug, Error)]
pub enum BayesError {

    #[error("Invalid dimensions for {what}: expected {expected}, found {found}")]
    InvalidDimensions { what : &'static str, expected : usize, found : usize },

    #[error("Posterior precision matrix is not invertible ({0})")]
    NumericalSingularity(String),

    #[error("Numerical instability during fit ({0})")]
    NumericalInstability(String),

    #[error("Invalid model state: {0}")]
    InvalidState(&'static str),

    #[error("Invalid fit settings: {0}")]
    InvalidSettings(String),

    #[error("Unknown basis function '{0}' (expected polynomial, identity or gaussian)")]
    UnknownBasis(String),

    #[error("Column '{0}' not found in table header")]
    MissingColumn(String),

    #[error("Could not parse value '{value}' at record {row}")]
    Parse { row : usize, value : String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error)

}
