use nalgebra::*;

/// n points evenly spaced over [start, end], both ends included.
/// A single point sits at start.
pub fn linspace(start : f64, end : f64, n : usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64 ).collect()
        }
    }
}

fn gaussian_bump(x : f64, mu : f64, sigma : f64) -> f64 {
    (-0.5 * (x - mu).powi(2) / sigma.powi(2)).exp()
}

/// First column holds the raw input; the remaining columns hold one
/// Gaussian bump per (center, width) pair, widths varying fastest.
pub fn gaussian(x : &DVector<f64>, centers : &[f64], widths : &[f64]) -> DMatrix<f64> {
    let k = widths.len();
    DMatrix::from_fn(x.nrows(), 1 + centers.len() * k, |i, j| {
        if j == 0 {
            x[i]
        } else {
            let (c, w) = ((j - 1) / k, (j - 1) % k);
            gaussian_bump(x[i], centers[c], widths[w])
        }
    })
}

#[test]
fn linspace_endpoints() {
    let v = linspace(0.0, 1.0, 5);
    assert_eq!(v, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    assert_eq!(linspace(0.0, 1.0, 1), vec![0.0]);
    assert!(linspace(0.0, 1.0, 0).is_empty());
}

#[test]
fn gaussian_layout() {
    let x = DVector::from_vec(vec![0.0, 1.0]);
    let phi = gaussian(&x, &[0.0, 1.0], &[0.1, 1.0]);
    assert_eq!(phi.shape(), (2, 5));
    assert_eq!(phi.column(0), x);
    // x = 0 sits on the first center for both widths.
    assert_eq!(phi[(0, 1)], 1.0);
    assert_eq!(phi[(0, 2)], 1.0);
    assert!((phi[(0, 4)] - (-0.5f64).exp()).abs() < 1e-15);
    assert!(phi[(0, 3)] < 1e-20);
}
