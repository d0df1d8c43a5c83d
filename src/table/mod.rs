use nalgebra::*;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use crate::error::BayesError;

/// CSV parsing utilities.
pub mod csv;

/// Reads the named column of a headered CSV file, returning the implicit index
/// sequence 0..n and the column values.
pub fn load_column<P>(path : P, column : &str) -> Result<(DVector<f64>, DVector<f64>), BayesError>
where
    P : AsRef<Path>
{
    let f = File::open(path)?;
    load_column_from_reader(f, column)
}

/// Same as load_column, over any reader yielding CSV content.
pub fn load_column_from_reader<R>(reader : R, column : &str) -> Result<(DVector<f64>, DVector<f64>), BayesError>
where
    R : Read
{
    let values = self::csv::parse_numeric_column(reader, column)?;
    let n = values.len();
    let index = DVector::from_iterator(n, (0..n).map(|i| i as f64 ));
    Ok((index, DVector::from_vec(values)))
}
