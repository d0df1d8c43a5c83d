/// Error type shared by the estimation engine and the data plumbing around it.
pub mod error;

/// Bayesian linear regression whose prior and noise precisions are selected by
/// maximizing the marginal likelihood (evidence approximation); exposes the
/// posterior over the weights and the posterior predictive distribution.
pub mod fit;

/// Basis expansions (polynomial, identity and Gaussian) that turn scalar inputs
/// into design matrices for the linear model.
pub mod basis;

/// Loading of numeric series from CSV tables.
pub mod table;

/// Error summaries (mean absolute and mean relative errors) of predicted series.
pub mod calc;

/// Sampling from the weight posterior and synthetic curve generation.
pub mod sim;

pub use error::BayesError;

pub use fit::{BayesianModel, Estimator, FitReport, FitSettings, Posterior, Prediction};

pub use basis::{Basis, BasisFunction, BasisKind};
