use nalgebra::*;
use approx::assert_relative_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use bayes_curve::basis::{Basis, BasisFunction};
use bayes_curve::fit::{BayesianModel, Estimator, FitSettings};
use bayes_curve::{sim, table, BayesError};

fn quadratic_data() -> (DMatrix<f64>, DVector<f64>) {
    let x = DVector::from_vec(vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    let noise = [0.05, -0.04, -0.02, 0.06, -0.05];
    let phi = BasisFunction::Polynomial { degree : 3 }.generate(&x);
    let t = DVector::from_fn(5, |i, _| (x[i] + 1.0).powi(2) + noise[i] );
    (phi, t)
}

#[test]
fn quadratic_end_to_end() {
    let (phi, t) = quadratic_data();
    let mut model = BayesianModel::default();
    let settings = FitSettings::default();
    let report = model.fit(&phi, &t, &settings).unwrap();
    assert!(report.converged);
    assert!(report.iterations < settings.max_iter);
    assert_eq!(report.iterations, report.trajectory.len());
    assert_eq!(report.alpha, model.alpha());
    assert_eq!(report.beta, model.beta());

    let phi_new = DMatrix::from_row_slice(1, 3, &[1.0, 2.5, 6.25]);
    let pred = model.predict(&phi_new).unwrap();
    assert_eq!(pred.len(), 1);
    assert!((pred.mean[0] - 12.25).abs() < 0.3, "mean = {}", pred.mean[0]);
    assert!(pred.var[0] < 0.5, "var = {}", pred.var[0]);
    assert!(pred.var[0] >= 1.0 / model.beta());
}

#[test]
fn exact_quadratic_exits_softly_with_growing_noise_precision() {
    // Noiseless targets: the residuals keep shrinking, so beta never settles
    // and the iteration exhausts max_iter while still storing a posterior.
    let x = DVector::from_vec(vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    let phi = BasisFunction::Polynomial { degree : 3 }.generate(&x);
    let t = DVector::from_vec(vec![1.0, 2.25, 4.0, 6.25, 9.0]);
    let mut model = BayesianModel::default();
    let settings = FitSettings::default();
    let report = model.fit(&phi, &t, &settings).unwrap();
    assert!(!report.converged);
    assert_eq!(report.iterations, settings.max_iter);
    assert_eq!(report.trajectory.len(), settings.max_iter);
    assert!(model.is_fitted());
    assert!(model.beta() > 1e20, "beta = {}", model.beta());
    assert_relative_eq!(model.alpha(), 0.5, max_relative = 1e-6);

    let phi_new = DMatrix::from_row_slice(1, 3, &[1.0, 2.5, 6.25]);
    let pred = model.predict(&phi_new).unwrap();
    assert!((pred.mean[0] - 12.25).abs() < 1e-6, "mean = {}", pred.mean[0]);
    assert!(pred.var[0] < 1e-10, "var = {}", pred.var[0]);
    assert!(pred.var[0] >= 1.0 / model.beta());
}

#[test]
fn cubic_coefficients_are_recovered() {
    let mut rng = StdRng::seed_from_u64(3);
    let coefs = [0.5, -1.0, 2.0, 1.5];
    let x = DVector::from_fn(50, |i, _| -1.0 + 2.0 * i as f64 / 49.0 );
    let t = sim::noisy_curve(&x, &coefs, 0.02, &mut rng).unwrap();
    let phi = BasisFunction::Polynomial { degree : 4 }.generate(&x);
    let mut model = BayesianModel::default();
    let settings = FitSettings::default();
    let report = model.fit(&phi, &t, &settings).unwrap();
    assert!(report.converged);
    assert!(report.iterations < settings.max_iter);
    let m = model.mean().unwrap();
    for (est, truth) in m.iter().zip(coefs.iter()) {
        assert!((est - truth).abs() < 0.15, "estimated {} for coefficient {}", est, truth);
    }

    // The fitted hyperparameters sit far above the vague starting point in evidence.
    let first = report.trajectory.first().unwrap().log_evidence;
    let last = report.trajectory.last().unwrap().log_evidence;
    assert!(last > first);
    assert_relative_eq!(model.log_evidence(&phi, &t).unwrap(), last, max_relative = 1e-6);
}

#[test]
fn constant_basis_recovers_mean_and_noise() {
    let mut rng = StdRng::seed_from_u64(11);
    let noise = Normal::new(3.0, 0.5).unwrap();
    let n = 2000;
    let t = DVector::from_fn(n, |_, _| noise.sample(&mut rng) );
    let phi = DMatrix::from_element(n, 1, 1.0);
    let mut model = BayesianModel::default();
    model.fit(&phi, &t, &FitSettings::default()).unwrap();
    let mean = t.mean();
    let var = t.iter().map(|v| (v - mean).powi(2) ).sum::<f64>() / (n - 1) as f64;
    assert_relative_eq!(model.mean().unwrap()[0], mean, max_relative = 1e-3);
    assert_relative_eq!(model.beta(), 1.0 / var, max_relative = 1e-2);
}

#[test]
fn predictive_variance_has_noise_floor() {
    let mut rng = StdRng::seed_from_u64(5);
    let x = DVector::from_fn(40, |i, _| i as f64 / 40.0 );
    let t = sim::noisy_curve(&x, &[1.0, 0.5, -2.0], 0.1, &mut rng).unwrap();
    let basis = BasisFunction::Polynomial { degree : 3 };
    let mut model = BayesianModel::default();
    model.fit(&basis.generate(&x), &t, &FitSettings::default()).unwrap();
    let x_new = DVector::from_fn(7, |i, _| -0.5 + 0.3 * i as f64 );
    let pred = model.predict(&basis.generate(&x_new)).unwrap();
    assert_eq!(pred.mean.nrows(), 7);
    assert_eq!(pred.var.nrows(), 7);
    let floor = 1.0 / model.beta();
    assert!(pred.var.iter().all(|v| *v >= floor ));
    assert!(pred.std_dev().iter().zip(pred.var.iter()).all(|(s, v)| (s * s - v).abs() < 1e-12 * v.max(1.0) ));
}

#[test]
fn predict_before_fit_is_invalid_state() {
    let model = BayesianModel::default();
    let phi = DMatrix::from_element(3, 2, 1.0);
    assert!(matches!(model.predict(&phi), Err(BayesError::InvalidState(_))));
    assert!(model.fitted().is_none());
}

#[test]
fn fit_with_mismatched_targets_is_invalid_dimensions() {
    let phi = DMatrix::from_element(5, 2, 1.0);
    let t = DVector::from_element(4, 1.0);
    let mut model = BayesianModel::default();
    match model.fit(&phi, &t, &FitSettings::default()) {
        Err(BayesError::InvalidDimensions { expected, found, .. }) => {
            assert_eq!(expected, 5);
            assert_eq!(found, 4);
        },
        other => panic!("Expected dimension error, got {:?}", other)
    }
    assert!(!model.is_fitted());
    assert!(matches!(model.posterior(&phi, &t), Err(BayesError::InvalidDimensions { .. })));
}

#[test]
fn estimator_trait_exposes_fitted_posterior() {
    let (phi, t) = quadratic_data();
    let mut model = BayesianModel::default();
    let report = Estimator::fit(&mut model, &phi, &t, &FitSettings::default()).unwrap();
    assert!(report.converged);
    let post = model.fitted().unwrap();
    assert_eq!(post.dim(), 3);
    assert_eq!(Some(&post.mean), model.mean());
}

#[test]
fn saved_model_predicts_identically() {
    let (phi, t) = quadratic_data();
    let mut model = BayesianModel::default();
    model.fit(&phi, &t, &FitSettings::default()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    model.save_to_path(&path).unwrap();
    let loaded = BayesianModel::load_from_path(&path).unwrap();
    let a = model.predict(&phi).unwrap();
    let b = loaded.predict(&phi).unwrap();
    assert_relative_eq!(a.mean, b.mean, max_relative = 1e-12);
    assert_relative_eq!(a.var, b.var, max_relative = 1e-12);
}

#[test]
fn csv_series_pipeline() {
    let mut content = String::from("\u{feff}date,open\n");
    for i in 0..30 {
        let x = i as f64 / 31.0;
        content.push_str(&format!("d{},{}\n", i, 10.0 + 4.0 * x - 3.0 * x * x + 0.01 * ((i % 3) as f64 - 1.0)));
    }
    let (index, values) = table::load_column_from_reader(content.as_bytes(), "open").unwrap();
    assert_eq!(index.nrows(), 30);
    assert_eq!(index[29], 29.0);
    let x = index / 31.0;
    let basis = BasisFunction::Polynomial { degree : 3 };
    let train = x.rows(0, 29).clone_owned();
    let mut model = BayesianModel::default();
    model.fit(&basis.generate(&train), &values.rows(0, 29).clone_owned(), &FitSettings::default()).unwrap();
    let pred = model.predict(&basis.generate(&x)).unwrap();
    let perf = bayes_curve::calc::Performance::evaluate(&values, &pred.mean).unwrap();
    assert!(perf.mae < 0.05, "{}", perf);
    assert!(perf.mre < 0.01, "{}", perf);
}
