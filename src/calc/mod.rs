use nalgebra::*;
use std::fmt;
use crate::error::BayesError;

// Predictions may cover fewer points than the observed series; the
// observations past the predicted range are ignored.
fn aligned<'a>(
    truth : &'a DVector<f64>,
    predicted : &DVector<f64>
) -> Result<DVectorSlice<'a, f64>, BayesError> {
    let n = predicted.nrows();
    if truth.nrows() < n {
        return Err(BayesError::InvalidDimensions { what : "observed series", expected : n, found : truth.nrows() });
    }
    Ok(truth.rows(0, n))
}

/// Mean of |predicted - truth|, over the predicted range.
pub fn mean_absolute_error(truth : &DVector<f64>, predicted : &DVector<f64>) -> Result<f64, BayesError> {
    let truth = aligned(truth, predicted)?;
    let n = predicted.nrows() as f64;
    Ok(predicted.iter().zip(truth.iter()).map(|(p, t)| (p - t).abs() ).sum::<f64>() / n)
}

/// Mean of |predicted - truth| / |truth|, over the predicted range.
pub fn mean_relative_error(truth : &DVector<f64>, predicted : &DVector<f64>) -> Result<f64, BayesError> {
    let truth = aligned(truth, predicted)?;
    let n = predicted.nrows() as f64;
    Ok(predicted.iter().zip(truth.iter()).map(|(p, t)| (p - t).abs() / t.abs() ).sum::<f64>() / n)
}

/// Error summary of a prediction against the observed series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Performance {
    pub mae : f64,
    pub mre : f64
}

impl Performance {

    pub fn evaluate(truth : &DVector<f64>, predicted : &DVector<f64>) -> Result<Self, BayesError> {
        let mae = mean_absolute_error(truth, predicted)?;
        let mre = mean_relative_error(truth, predicted)?;
        Ok(Self { mae, mre })
    }

}

impl fmt::Display for Performance {

    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MAE:{}\nMRE:{}", self.mae, self.mre)
    }

}

#[test]
fn errors_over_predicted_range() {
    let truth = DVector::from_vec(vec![2.0, 4.0, 5.0, 100.0]);
    let predicted = DVector::from_vec(vec![1.0, 5.0, 5.0]);
    let perf = Performance::evaluate(&truth, &predicted).unwrap();
    assert!((perf.mae - 2.0 / 3.0).abs() < 1e-12);
    assert!((perf.mre - (0.5 + 0.25) / 3.0).abs() < 1e-12);
    assert_eq!(format!("{}", Performance { mae : 1.5, mre : 0.25 }), "MAE:1.5\nMRE:0.25");
}

#[test]
fn short_truth_is_rejected() {
    let truth = DVector::from_vec(vec![1.0]);
    let predicted = DVector::from_vec(vec![1.0, 2.0]);
    assert!(mean_absolute_error(&truth, &predicted).is_err());
}
