use nalgebra::*;
use std::f64::consts::PI;
use crate::error::BayesError;

/// Eigenvalues of the (symmetric, positive semi-definite) Gram matrix X^T X.
/// Round-off can produce tiny negative values for rank-deficient designs; those
/// are clamped to zero, since the Gram matrix has no negative spectrum.
pub fn gram_eigenvalues(gram : &DMatrix<f64>) -> DVector<f64> {
    gram.symmetric_eigenvalues().map(|l| l.max(0.0) )
}

/// Effective number of well-determined parameters, sum_i l_i / (l_i + alpha),
/// where l_i are the Gram eigenvalues already scaled by the noise precision.
pub fn effective_dof(scaled_eigen : &DVector<f64>, alpha : f64) -> f64 {
    scaled_eigen.iter().map(|l| l / (l + alpha) ).sum()
}

/// Closeness test between the previous and the updated value of a hyperparameter:
/// |prev - new| <= atol + rtol * |new|.
pub fn is_close(prev : f64, new : f64, rtol : f64, atol : f64) -> bool {
    (prev - new).abs() <= atol + rtol * new.abs()
}

/// Precisions must stay strictly positive and finite.
pub fn check_precision(name : &str, value : f64) -> Result<f64, BayesError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(BayesError::NumericalInstability(format!("{} = {}", name, value)))
    }
}

/// Log marginal likelihood of a Gaussian linear model,
/// M/2 ln(alpha) + N/2 ln(beta) - E(m) - 1/2 ln|A| - N/2 ln(2 pi),
/// where E(m) = beta/2 ||t - X m||^2 + alpha/2 m^T m and A is the posterior precision.
pub fn log_evidence(
    n : usize,
    m : usize,
    alpha : f64,
    beta : f64,
    sse : f64,
    mean_sq_norm : f64,
    log_det_precision : f64
) -> f64 {
    let energy = 0.5 * beta * sse + 0.5 * alpha * mean_sq_norm;
    0.5 * m as f64 * alpha.ln() + 0.5 * n as f64 * beta.ln() - energy -
        0.5 * log_det_precision - 0.5 * n as f64 * (2.0 * PI).ln()
}

#[test]
fn eigenvalues_of_diagonal_gram() {
    let gram = DMatrix::from_diagonal(&DVector::from_vec(vec![4.0, 1.0, 9.0]));
    let mut eigen : Vec<f64> = gram_eigenvalues(&gram).iter().cloned().collect();
    eigen.sort_by(|a, b| a.partial_cmp(b).unwrap() );
    assert!((eigen[0] - 1.0).abs() < 1e-12);
    assert!((eigen[1] - 4.0).abs() < 1e-12);
    assert!((eigen[2] - 9.0).abs() < 1e-12);
}

#[test]
fn effective_dof_bounds() {
    let eigen = DVector::from_vec(vec![1e6, 1e6, 1e-6]);
    let gamma = effective_dof(&eigen, 1.0);
    assert!(gamma > 1.99 && gamma < 2.01);
    assert!(effective_dof(&eigen, 1e12) < 1e-5);
}

#[test]
fn closeness_uses_both_tolerances() {
    assert!(is_close(1.0, 1.0 + 1e-13, 1e-12, 0.0));
    assert!(!is_close(1.0, 1.0 + 1e-6, 1e-12, 0.0));
    assert!(is_close(1e-10, 2e-10, 1e-12, 1e-8));
}

#[test]
fn precision_guard() {
    assert!(check_precision("alpha", 0.5).is_ok());
    assert!(check_precision("alpha", 0.0).is_err());
    assert!(check_precision("beta", f64::INFINITY).is_err());
    assert!(check_precision("beta", f64::NAN).is_err());
}
