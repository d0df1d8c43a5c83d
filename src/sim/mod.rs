use nalgebra::*;
use rand::Rng;
use rand_distr::{Normal, StandardNormal};
use crate::error::BayesError;
use crate::fit::Posterior;

/// Draws n weight vectors (one per column) from the Gaussian posterior N(m, S),
/// as m + L z with S = L L^T and z standard normal.
pub fn sample_weights<R>(post : &Posterior, n : usize, rng : &mut R) -> Result<DMatrix<f64>, BayesError>
where
    R : Rng + ?Sized
{
    let cov_chol = Cholesky::new(post.cov.clone())
        .ok_or_else(|| BayesError::NumericalSingularity(String::from("posterior covariance is not positive-definite")) )?;
    let lower = cov_chol.l();
    let dim = post.dim();
    let mut draws = DMatrix::zeros(dim, n);
    for j in 0..n {
        let z : DVector<f64> = DVector::from_fn(dim, |_, _| rng.sample(StandardNormal) );
        draws.set_column(j, &(&post.mean + &lower * z));
    }
    Ok(draws)
}

/// Evaluates the polynomial sum_k coefs[k] x^k at every x and adds zero-mean
/// Gaussian noise with the informed standard deviation.
pub fn noisy_curve<R>(
    x : &DVector<f64>,
    coefs : &[f64],
    noise_sd : f64,
    rng : &mut R
) -> Result<DVector<f64>, BayesError>
where
    R : Rng + ?Sized
{
    let noise = Normal::new(0.0, noise_sd)
        .map_err(|e| BayesError::InvalidSettings(format!("noise standard deviation {}: {}", noise_sd, e)) )?;
    Ok(x.map(|xi| coefs.iter().rev().fold(0.0, |acc, c| acc * xi + c ) + rng.sample(noise) ))
}

#[cfg(test)]
mod tests {

    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn noiseless_curve_is_polynomial() {
        let mut rng = StdRng::seed_from_u64(7);
        let x = DVector::from_vec(vec![0.0, 1.0, 2.0]);
        let y = noisy_curve(&x, &[1.0, 2.0, 1.0], 0.0, &mut rng).unwrap();
        assert_eq!(y, DVector::from_vec(vec![1.0, 4.0, 9.0]));
        assert!(noisy_curve(&x, &[1.0], -1.0, &mut rng).is_err());
    }

    #[test]
    fn weight_draws_center_on_posterior_mean() {
        let mut rng = StdRng::seed_from_u64(42);
        let cov = DMatrix::from_row_slice(2, 2, &[0.04, 0.01, 0.01, 0.09]);
        let precision = cov.clone().try_inverse().unwrap();
        let post = Posterior { mean : DVector::from_vec(vec![1.0, -2.0]), cov, precision };
        let n = 20_000;
        let draws = sample_weights(&post, n, &mut rng).unwrap();
        assert_eq!(draws.shape(), (2, n));
        let avg = draws.column_mean();
        assert!((avg[0] - 1.0).abs() < 5.0 * (0.04f64 / n as f64).sqrt());
        assert!((avg[1] + 2.0).abs() < 5.0 * (0.09f64 / n as f64).sqrt());
        let var0 = draws.row(0).iter().map(|w| (w - avg[0]).powi(2) ).sum::<f64>() / (n - 1) as f64;
        assert!((var0 - 0.04).abs() < 0.004);
    }

}
