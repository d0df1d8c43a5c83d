use nalgebra::*;
use serde::{Serialize, Deserialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use crate::error::BayesError;

/// Helpers shared by the evidence iteration: Gram spectrum, effective
/// number of parameters, closeness test and hyperparameter guards.
pub mod utils;

/// Bayesian linear regression with evidence-maximizing hyperparameters.
/// The posterior is the closed-form Gaussian over the regression weights;
/// the prior precision (alpha) and noise precision (beta) are re-estimated
/// by a fixed-point iteration over the eigenvalues of the Gram matrix.
pub mod linear;

pub use linear::*;

/// Trait shared by estimators that learn from a design matrix and a target vector,
/// parametrized by the posterior representation they keep after fitting.
pub trait Estimator {

    type Posterior;

    /// Runs the inference algorithm for the informed design matrix and targets,
    /// storing the resulting posterior on success.
    fn fit(
        &mut self,
        phi : &DMatrix<f64>,
        t : &DVector<f64>,
        settings : &FitSettings
    ) -> Result<FitReport, BayesError>;

    /// If fit(.) has been called successfully at least once, returns the current state
    /// of the posterior distribution, without changing the algorithm state.
    fn fitted(&self) -> Option<&Self::Posterior>;

}

/// Stopping rules for the evidence iteration. Missing fields take
/// their default values when deserialized, so partial JSON configurations
/// are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitSettings {

    pub max_iter : usize,

    /// Relative tolerance of the closeness test applied to alpha and beta.
    pub rtol : f64,

    /// Absolute tolerance of the closeness test.
    pub atol : f64,

    /// Log each iteration at info level instead of debug.
    pub verbose : bool

}

impl Default for FitSettings {

    fn default() -> Self {
        Self { max_iter : 200, rtol : 1e-12, atol : 1e-8, verbose : false }
    }

}

impl FitSettings {

    pub fn max_iter(mut self, max_iter : usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn rtol(mut self, rtol : f64) -> Self {
        self.rtol = rtol;
        self
    }

    pub fn atol(mut self, atol : f64) -> Self {
        self.atol = atol;
        self
    }

    pub fn verbose(mut self, verbose : bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), BayesError> {
        if self.max_iter == 0 {
            return Err(BayesError::InvalidSettings(String::from("max_iter must be positive")));
        }
        if !(self.rtol >= 0.0) || !(self.atol >= 0.0) {
            let msg = format!("tolerances must be non-negative (rtol = {}, atol = {})", self.rtol, self.atol);
            return Err(BayesError::InvalidSettings(msg));
        }
        Ok(())
    }

}

/// Hyperparameter state after one pass of the evidence iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationState {

    /// 1-based iteration counter.
    pub iteration : usize,

    /// Prior precision after the update.
    pub alpha : f64,

    /// Noise precision after the update.
    pub beta : f64,

    /// Effective number of well-determined parameters.
    pub gamma : f64,

    /// Log-evidence at the hyperparameters the posterior of this
    /// iteration was computed with (i.e. before the update).
    pub log_evidence : f64

}

/// Sequence of hyperparameter iterations, kept so that callers can
/// monitor the optimization trajectory after (or instead of) verbose logging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trajectory {
    states : Vec<IterationState>
}

impl Trajectory {

    pub fn new() -> Self {
        Self { states : Vec::new() }
    }

    pub fn step(&mut self, state : IterationState) {
        self.states.push(state);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn first(&self) -> Option<&IterationState> {
        self.states.first()
    }

    pub fn last(&self) -> Option<&IterationState> {
        self.states.last()
    }

    pub fn iter(&self) -> impl Iterator<Item=&IterationState> {
        self.states.iter()
    }

    /// Hyperparameter trajectory as a 4 x n matrix with rows alpha, beta, gamma and log-evidence.
    pub fn as_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(4, self.states.len(), |i, j| {
            let s = &self.states[j];
            match i {
                0 => s.alpha,
                1 => s.beta,
                2 => s.gamma,
                _ => s.log_evidence
            }
        })
    }

    pub fn save<W>(&self, mut writer : W) -> Result<(), BayesError>
    where
        W : Write
    {
        let content = serde_json::to_string_pretty(&self)?;
        writer.write_all(content.as_bytes())?;
        Ok(())
    }

    pub fn save_to_path<P>(&self, path : P) -> Result<(), BayesError>
    where
        P : AsRef<Path>
    {
        let file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
        self.save(file)
    }

}

/// Outcome of a call to fit(.). A fit that exhausts max_iter still stores
/// the last posterior; converged is false in that case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReport {

    pub iterations : usize,

    pub converged : bool,

    pub alpha : f64,

    pub beta : f64,

    pub gamma : f64,

    pub trajectory : Trajectory

}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn settings_defaults_fill_partial_json() {
        let settings : FitSettings = serde_json::from_str(r#"{ "max_iter" : 50 }"#).unwrap();
        assert_eq!(settings.max_iter, 50);
        let built = FitSettings::default().max_iter(10).rtol(1e-6).atol(1e-3).verbose(true);
        assert_eq!((built.max_iter, built.rtol, built.atol, built.verbose), (10, 1e-6, 1e-3, true));
        assert_eq!(settings.rtol, 1e-12);
        assert_eq!(settings.atol, 1e-8);
        assert!(!settings.verbose);
    }

    #[test]
    fn settings_reject_zero_iterations() {
        let settings = FitSettings::default().max_iter(0);
        assert!(matches!(settings.validate(), Err(BayesError::InvalidSettings(_))));
        assert!(FitSettings::default().validate().is_ok());
        let negative = FitSettings::default().atol(-1.0);
        assert!(matches!(negative.validate(), Err(BayesError::InvalidSettings(_))));
    }

    #[test]
    fn trajectory_matrix_layout() {
        let mut traj = Trajectory::new();
        traj.step(IterationState { iteration : 1, alpha : 1.0, beta : 2.0, gamma : 0.5, log_evidence : -3.0 });
        traj.step(IterationState { iteration : 2, alpha : 1.5, beta : 2.5, gamma : 0.7, log_evidence : -2.0 });
        let m = traj.as_matrix();
        assert_eq!(m.shape(), (4, 2));
        assert_eq!(m[(0, 1)], 1.5);
        assert_eq!(m[(3, 0)], -3.0);
        assert_eq!(traj.last().unwrap().iteration, 2);
    }

}
