use nalgebra::*;

/// Expands x into the powers x^0 .. x^(degree - 1), one column per power.
pub fn polynomial(x : &DVector<f64>, degree : usize) -> DMatrix<f64> {
    DMatrix::from_fn(x.nrows(), degree, |i, j| x[i].powi(j as i32) )
}

/// Repeats x over `degree` columns.
pub fn identity(x : &DVector<f64>, degree : usize) -> DMatrix<f64> {
    DMatrix::from_fn(x.nrows(), degree, |i, _| x[i] )
}

#[test]
fn polynomial_columns() {
    let x = DVector::from_vec(vec![0.0, 0.5, 2.0]);
    let phi = polynomial(&x, 3);
    assert_eq!(phi.shape(), (3, 3));
    assert_eq!(phi.column(0), DVector::from_element(3, 1.0));
    assert_eq!(phi.column(1), x);
    assert_eq!(phi[(2, 2)], 4.0);
}

#[test]
fn identity_columns() {
    let x = DVector::from_vec(vec![1.0, -3.0]);
    let phi = identity(&x, 4);
    assert_eq!(phi.shape(), (2, 4));
    assert!(phi.row(1).iter().all(|v| *v == -3.0 ));
}
