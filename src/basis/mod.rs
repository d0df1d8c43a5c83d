use nalgebra::*;
use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;
use crate::error::BayesError;

/// Polynomial basis expansion to arbitrary degree, and the degenerate identity
/// expansion that repeats the input. A polynomial basis expansion can be seen
/// as a Taylor series approximation to a conditional expectation.
pub mod poly;

/// Gaussian radial basis expansion over a grid of centers and widths, which
/// approximates conditional expectations that vary locally over the domain.
pub mod radial;

/// Maps a vector of scalar inputs to a design matrix with one row per input
/// and one column per basis feature. The column count depends only on the
/// basis parameters, so train and test designs built from the same basis
/// always agree on it.
pub trait Basis {

    fn generate(&self, x : &DVector<f64>) -> DMatrix<f64>;

    fn n_features(&self) -> usize;

}

/// Family of basis functions, as selected from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BasisKind {
    Polynomial,
    Identity,
    Gaussian
}

impl FromStr for BasisKind {

    type Err = BayesError;

    fn from_str(s : &str) -> Result<Self, Self::Err> {
        match &s.to_lowercase()[..] {
            "polynomial" => Ok(BasisKind::Polynomial),
            "identity" => Ok(BasisKind::Identity),
            "gaussian" => Ok(BasisKind::Gaussian),
            other => Err(BayesError::UnknownBasis(other.to_string()))
        }
    }

}

impl fmt::Display for BasisKind {

    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BasisKind::Polynomial => "polynomial",
            BasisKind::Identity => "identity",
            BasisKind::Gaussian => "gaussian"
        };
        write!(f, "{}", name)
    }

}

/// Concrete basis, carrying the parameters of its family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BasisFunction {

    /// Columns x^0, x^1, ..., x^(degree - 1).
    Polynomial { degree : usize },

    /// degree copies of x.
    Identity { degree : usize },

    /// The raw input followed by exp(-(x - mu)^2 / (2 sigma^2)) for every
    /// center mu and, within it, every width sigma.
    Gaussian { centers : Vec<f64>, widths : Vec<f64> }

}

impl BasisFunction {

    /// Gaussian basis with `degree` centers evenly spaced over [0, 1] and
    /// widths 0.1, 0.01, 0.001 and 0.0001 at each center.
    pub fn gaussian_grid(degree : usize) -> Self {
        let centers = radial::linspace(0.0, 1.0, degree);
        let widths = (1..5).map(|i| 0.1f64.powi(i) ).collect();
        BasisFunction::Gaussian { centers, widths }
    }

    pub fn from_kind(kind : BasisKind, degree : usize) -> Self {
        match kind {
            BasisKind::Polynomial => BasisFunction::Polynomial { degree },
            BasisKind::Identity => BasisFunction::Identity { degree },
            BasisKind::Gaussian => Self::gaussian_grid(degree)
        }
    }

    pub fn kind(&self) -> BasisKind {
        match self {
            BasisFunction::Polynomial { .. } => BasisKind::Polynomial,
            BasisFunction::Identity { .. } => BasisKind::Identity,
            BasisFunction::Gaussian { .. } => BasisKind::Gaussian
        }
    }

}

impl Basis for BasisFunction {

    fn generate(&self, x : &DVector<f64>) -> DMatrix<f64> {
        match self {
            BasisFunction::Polynomial { degree } => poly::polynomial(x, *degree),
            BasisFunction::Identity { degree } => poly::identity(x, *degree),
            BasisFunction::Gaussian { centers, widths } => radial::gaussian(x, centers, widths)
        }
    }

    fn n_features(&self) -> usize {
        match self {
            BasisFunction::Polynomial { degree } | BasisFunction::Identity { degree } => *degree,
            BasisFunction::Gaussian { centers, widths } => 1 + centers.len() * widths.len()
        }
    }

}
