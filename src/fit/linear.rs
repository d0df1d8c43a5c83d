use nalgebra::*;
use serde::{Serialize, Deserialize};
use std::default::Default;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use crate::error::BayesError;
use super::{Estimator, FitSettings, FitReport, IterationState, Trajectory};
use super::utils;

/// Gaussian posterior over the regression weights, N(mean, cov), with
/// precision = cov^-1 = alpha I + beta X^T X. The three fields are always
/// computed together from the same (X, t, alpha, beta).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posterior {

    pub mean : DVector<f64>,

    pub cov : DMatrix<f64>,

    pub precision : DMatrix<f64>

}

impl Posterior {

    /// Carry estimation from the cross-product matrices (X^T X) and (X^T t),
    /// which lets iterative callers form them once per design.
    pub fn estimate_from_cp(
        xx : &DMatrix<f64>,
        xy : &DVector<f64>,
        alpha : f64,
        beta : f64
    ) -> Result<Self, BayesError> {
        factorize(xx, xy, alpha, beta).map(|(post, _)| post )
    }

    /// Number of basis features.
    pub fn dim(&self) -> usize {
        self.mean.nrows()
    }

}

// Builds the posterior precision and solves it through its Cholesky factor,
// returning the posterior and ln|precision|.
fn factorize(
    xx : &DMatrix<f64>,
    xy : &DVector<f64>,
    alpha : f64,
    beta : f64
) -> Result<(Posterior, f64), BayesError> {
    utils::check_precision("alpha", alpha)?;
    utils::check_precision("beta", beta)?;
    let m = xx.nrows();
    let precision = DMatrix::<f64>::identity(m, m) * alpha + xx * beta;
    let chol = Cholesky::new(precision.clone()).ok_or_else(|| {
        BayesError::NumericalSingularity(String::from("Cholesky factorization failed"))
    })?;
    let cov = chol.inverse();
    let mean = chol.solve(&(xy * beta));
    if cov.iter().chain(mean.iter()).any(|v| !v.is_finite() ) {
        return Err(BayesError::NumericalSingularity(String::from("non-finite posterior entries")));
    }
    let log_det = 2.0 * chol.l_dirty().diagonal().iter().map(|d| d.ln() ).sum::<f64>();
    Ok((Posterior { mean, cov, precision }, log_det))
}

fn check_design(phi : &DMatrix<f64>, t : &DVector<f64>) -> Result<(), BayesError> {
    if phi.nrows() != t.nrows() {
        return Err(BayesError::InvalidDimensions {
            what : "target vector",
            expected : phi.nrows(),
            found : t.nrows()
        });
    }
    if phi.nrows() == 0 {
        return Err(BayesError::InvalidDimensions { what : "design matrix rows", expected : 1, found : 0 });
    }
    if phi.ncols() == 0 {
        return Err(BayesError::InvalidDimensions { what : "design matrix columns", expected : 1, found : 0 });
    }
    Ok(())
}

/// Mean and variance of the posterior predictive distribution, one entry per
/// row of the informed design matrix. Predictions are treated as independent,
/// so only the diagonal of the predictive covariance is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {

    pub mean : DVector<f64>,

    pub var : DVector<f64>

}

impl Prediction {

    pub fn len(&self) -> usize {
        self.mean.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.nrows() == 0
    }

    pub fn std_dev(&self) -> DVector<f64> {
        self.var.map(|v| v.sqrt() )
    }

}

/// Bayesian linear regression with an isotropic zero-mean Gaussian prior over the
/// weights (precision alpha) and Gaussian observation noise (precision beta).
/// Both precisions are selected by maximizing the marginal likelihood (evidence
/// approximation): each iteration computes the posterior under the current values,
/// the effective number of parameters gamma = sum_i l_i / (l_i + alpha) over the
/// eigenvalues l_i of beta X^T X, and then re-estimates
///
/// alpha = gamma / m^T m
/// beta = (N - gamma) / ||t - X m||^2
///
/// until both stop changing. The model owns (alpha, beta) and, after a successful
/// fit, the final posterior (m, S).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BayesianModel {

    alpha : f64,

    beta : f64,

    posterior : Option<Posterior>

}

impl Default for BayesianModel {

    fn default() -> Self {
        Self::new(Self::DEFAULT_PRECISION, Self::DEFAULT_PRECISION)
    }

}

impl BayesianModel {

    /// Initial value for both precisions when none are informed (weak prior, vague noise model).
    pub const DEFAULT_PRECISION : f64 = 1e-5;

    pub fn new(alpha : f64, beta : f64) -> Self {
        Self { alpha, beta, posterior : None }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn is_fitted(&self) -> bool {
        self.posterior.is_some()
    }

    /// Posterior weight mean, if the model was fitted.
    pub fn mean(&self) -> Option<&DVector<f64>> {
        self.posterior.as_ref().map(|p| &p.mean )
    }

    /// Posterior weight covariance, if the model was fitted.
    pub fn cov(&self) -> Option<&DMatrix<f64>> {
        self.posterior.as_ref().map(|p| &p.cov )
    }

    /// Computes the posterior under the current (alpha, beta) without changing the model:
    /// S^-1 = alpha I + beta X^T X; S = (S^-1)^-1; m = beta S X^T t.
    pub fn posterior(&self, phi : &DMatrix<f64>, t : &DVector<f64>) -> Result<Posterior, BayesError> {
        check_design(phi, t)?;
        Posterior::estimate_from_cp(&phi.tr_mul(phi), &phi.tr_mul(t), self.alpha, self.beta)
    }

    /// Log marginal likelihood ln p(t | alpha, beta) under the current hyperparameters.
    pub fn log_evidence(&self, phi : &DMatrix<f64>, t : &DVector<f64>) -> Result<f64, BayesError> {
        check_design(phi, t)?;
        let (post, log_det) = factorize(&phi.tr_mul(phi), &phi.tr_mul(t), self.alpha, self.beta)?;
        let sse = (t - phi * &post.mean).norm_squared();
        Ok(utils::log_evidence(
            phi.nrows(),
            phi.ncols(),
            self.alpha,
            self.beta,
            sse,
            post.mean.norm_squared(),
            log_det
        ))
    }

    /// Jointly infers the posterior and the evidence-maximizing (alpha, beta). The Gram
    /// spectrum is computed once, since the design does not change across iterations.
    /// The posterior is stored at convergence or, without it, after max_iter iterations.
    /// On error, the stored posterior is left untouched and (alpha, beta) hold the last
    /// valid iterate.
    pub fn fit(
        &mut self,
        phi : &DMatrix<f64>,
        t : &DVector<f64>,
        settings : &FitSettings
    ) -> Result<FitReport, BayesError> {
        check_design(phi, t)?;
        settings.validate()?;
        let (n, m) = phi.shape();
        let xx = phi.tr_mul(phi);
        let xy = phi.tr_mul(t);
        let eigen_0 = utils::gram_eigenvalues(&xx);
        let mut traj = Trajectory::new();
        let mut last : Option<(Posterior, f64)> = None;
        for iter in 0..settings.max_iter {
            let (pre_alpha, pre_beta) = (self.alpha, self.beta);
            let eigen = &eigen_0 * self.beta;
            let (post, log_det) = factorize(&xx, &xy, self.alpha, self.beta)?;
            let gamma = utils::effective_dof(&eigen, self.alpha);
            if !(gamma < n as f64) {
                let msg = format!("effective parameters {} reached the number of observations {}", gamma, n);
                return Err(BayesError::NumericalInstability(msg));
            }
            let mean_sq_norm = post.mean.norm_squared();
            let sse = (t - phi * &post.mean).norm_squared();
            let log_evidence = utils::log_evidence(n, m, pre_alpha, pre_beta, sse, mean_sq_norm, log_det);
            let alpha = utils::check_precision("alpha", gamma / mean_sq_norm)?;
            let beta = utils::check_precision("beta", (n as f64 - gamma) / sse)?;
            self.alpha = alpha;
            self.beta = beta;
            traj.step(IterationState { iteration : iter + 1, alpha, beta, gamma, log_evidence });
            if settings.verbose {
                log::info!("alpha:{} beta:{}", alpha, beta);
            } else {
                log::debug!("iteration {}: alpha = {:.6e}; beta = {:.6e}; gamma = {:.4}", iter + 1, alpha, beta, gamma);
            }
            let converged = utils::is_close(pre_alpha, alpha, settings.rtol, settings.atol) &&
                utils::is_close(pre_beta, beta, settings.rtol, settings.atol);
            if converged {
                log::info!("Convergence after {} iterations.", iter + 1);
                self.posterior = Some(post);
                return Ok(FitReport { iterations : iter + 1, converged : true, alpha, beta, gamma, trajectory : traj });
            }
            last = Some((post, gamma));
        }
        log::warn!("Stopped after {} iterations without convergence.", settings.max_iter);
        let (post, gamma) = last.ok_or(BayesError::InvalidState("evidence iteration did not run"))?;
        self.posterior = Some(post);
        Ok(FitReport {
            iterations : settings.max_iter,
            converged : false,
            alpha : self.alpha,
            beta : self.beta,
            gamma,
            trajectory : traj
        })
    }

    /// Mean and variance of the posterior predictive distribution for each row of phi:
    /// y = phi_i^T m; var = 1/beta + phi_i^T S phi_i.
    pub fn predict(&self, phi : &DMatrix<f64>) -> Result<Prediction, BayesError> {
        let post = self.posterior.as_ref()
            .ok_or(BayesError::InvalidState("predict called before a successful fit"))?;
        if phi.ncols() != post.dim() {
            return Err(BayesError::InvalidDimensions {
                what : "design matrix columns",
                expected : post.dim(),
                found : phi.ncols()
            });
        }
        let mean = phi * &post.mean;
        let var = (phi * &post.cov).component_mul(phi).column_sum().add_scalar(1. / self.beta);
        Ok(Prediction { mean, var })
    }

    pub fn load_from_path<P>(path : P) -> Result<Self, BayesError>
    where
        P : AsRef<Path>
    {
        let f = File::open(path)?;
        Self::load(f)
    }

    pub fn load<R>(mut reader : R) -> Result<Self, BayesError>
    where
        R : Read
    {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        let model = serde_json::from_str(&content[..])?;
        Ok(model)
    }

    pub fn save_to_path<P>(&self, path : P) -> Result<(), BayesError>
    where
        P : AsRef<Path>
    {
        let file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
        self.save(file)
    }

    pub fn save<W>(&self, mut writer : W) -> Result<(), BayesError>
    where
        W : Write
    {
        let content = serde_json::to_string_pretty(&self)?;
        writer.write_all(content.as_bytes())?;
        Ok(())
    }

}

impl Estimator for BayesianModel {

    type Posterior = Posterior;

    fn fit(
        &mut self,
        phi : &DMatrix<f64>,
        t : &DVector<f64>,
        settings : &FitSettings
    ) -> Result<FitReport, BayesError> {
        BayesianModel::fit(self, phi, t, settings)
    }

    fn fitted(&self) -> Option<&Posterior> {
        self.posterior.as_ref()
    }

}

#[cfg(test)]
fn quadratic_design() -> (DMatrix<f64>, DVector<f64>) {
    let x = [0.0, 0.5, 1.0, 1.5, 2.0];
    let noise = [0.05, -0.04, -0.02, 0.06, -0.05];
    let phi = DMatrix::from_fn(5, 3, |i, j| x[i].powi(j as i32) );
    let t = DVector::from_fn(5, |i, _| (x[i] + 1.0).powi(2) + noise[i] );
    (phi, t)
}

#[test]
fn posterior_is_symmetric_positive_definite() {
    let (phi, t) = quadratic_design();
    for &(alpha, beta) in [(1e-5, 1e-5), (0.5, 200.0), (10.0, 0.1)].iter() {
        let post = BayesianModel::new(alpha, beta).posterior(&phi, &t).unwrap();
        assert!((post.cov.clone() - post.cov.transpose()).amax() < 1e-8 * post.cov.amax());
        let eigen = post.cov.clone().symmetric_eigenvalues();
        assert!(eigen.iter().all(|l| *l > 0.0 ));
    }
}

#[test]
fn posterior_covariance_inverts_precision() {
    let (phi, t) = quadratic_design();
    let post = BayesianModel::new(0.5, 200.0).posterior(&phi, &t).unwrap();
    let prod = &post.cov * &post.precision;
    let err = (prod - DMatrix::<f64>::identity(3, 3)).amax();
    assert!(err < 1e-8, "S S^-1 deviates from identity by {}", err);
}

#[test]
fn posterior_does_not_mutate_model() {
    let (phi, t) = quadratic_design();
    let model = BayesianModel::new(0.5, 200.0);
    let _ = model.posterior(&phi, &t).unwrap();
    assert!(!model.is_fitted());
    assert_eq!(model.alpha(), 0.5);
    assert_eq!(model.beta(), 200.0);
}

#[test]
fn posterior_rejects_non_positive_precision() {
    let (phi, t) = quadratic_design();
    let res = BayesianModel::new(-1.0, 1.0).posterior(&phi, &t);
    assert!(matches!(res, Err(BayesError::NumericalInstability(_))));
}

#[test]
fn fit_rejects_non_positive_initial_alpha() {
    let (phi, t) = quadratic_design();
    let mut model = BayesianModel::new(0.0, 1.0);
    let res = model.fit(&phi, &t, &FitSettings::default());
    assert!(matches!(res, Err(BayesError::NumericalInstability(_))));
    assert!(!model.is_fitted());
}

#[test]
fn exhausted_iterations_still_store_posterior() {
    let (phi, t) = quadratic_design();
    let mut model = BayesianModel::default();
    let report = model.fit(&phi, &t, &FitSettings::default().max_iter(2)).unwrap();
    assert!(!report.converged);
    assert_eq!(report.iterations, 2);
    assert_eq!(report.trajectory.len(), 2);
    assert!(model.is_fitted());
    assert!(model.predict(&phi).is_ok());
}

#[test]
fn predict_checks_column_count() {
    let (phi, t) = quadratic_design();
    let mut model = BayesianModel::default();
    model.fit(&phi, &t, &FitSettings::default()).unwrap();
    let wrong = DMatrix::from_element(2, 4, 1.0);
    match model.predict(&wrong) {
        Err(BayesError::InvalidDimensions { expected, found, .. }) => {
            assert_eq!(expected, 3);
            assert_eq!(found, 4);
        },
        other => panic!("Expected dimension error, got {:?}", other)
    }
}

#[test]
fn log_evidence_matches_trajectory() {
    let (phi, t) = quadratic_design();
    let model = BayesianModel::default();
    let direct = model.log_evidence(&phi, &t).unwrap();
    let mut fitted = model.clone();
    let report = fitted.fit(&phi, &t, &FitSettings::default()).unwrap();
    let first = report.trajectory.first().unwrap().log_evidence;
    assert!((direct - first).abs() < 1e-8 * direct.abs().max(1.0));
}

#[test]
fn fit_rejects_effective_parameters_reaching_observations() {
    // Two observations, two well-determined directions and a vanishing prior give gamma = N.
    let phi = DMatrix::<f64>::identity(2, 2);
    let t = DVector::from_vec(vec![1.0, 2.0]);
    let mut model = BayesianModel::new(1e-20, 1.0);
    let res = model.fit(&phi, &t, &FitSettings::default());
    assert!(matches!(res, Err(BayesError::NumericalInstability(_))), "{:?}", res);
    assert!(!model.is_fitted());
}

#[test]
fn indefinite_precision_is_singular() {
    let xx = DMatrix::from_diagonal(&DVector::from_vec(vec![-1.0, 1.0]));
    let xy = DVector::from_vec(vec![1.0, 1.0]);
    let res = Posterior::estimate_from_cp(&xx, &xy, 1e-5, 1.0);
    assert!(matches!(res, Err(BayesError::NumericalSingularity(_))), "{:?}", res);
}
