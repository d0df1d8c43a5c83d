use ::csv;
use std::io::Read;
use crate::error::BayesError;

const BOM : char = '\u{feff}';

/// Spreadsheet exports often prefix the first header (and sometimes values) with a
/// UTF-8 byte order mark, which would otherwise prevent column names from matching.
pub fn strip_bom(entry : &str) -> &str {
    entry.trim_matches(BOM).trim()
}

/// Position of the named column in the header, ignoring byte order marks
/// and surrounding whitespace.
pub fn column_position(header : &csv::StringRecord, column : &str) -> Option<usize> {
    header.iter().position(|h| strip_bom(h) == column )
}

/// Parses every record of the named column as f64. Record numbers reported
/// in errors are 1-based and do not count the header line.
pub fn parse_numeric_column<R>(reader : R, column : &str) -> Result<Vec<f64>, BayesError>
where
    R : Read
{
    let mut csv_reader = csv::Reader::from_reader(reader);
    let header = csv_reader.headers()?.clone();
    let pos = column_position(&header, column)
        .ok_or_else(|| BayesError::MissingColumn(column.to_string()) )?;
    let mut values = Vec::new();
    for (ix_rec, row_record) in csv_reader.records().enumerate() {
        let row = row_record?;
        let entry = row.get(pos).unwrap_or("");
        let v = strip_bom(entry).parse::<f64>()
            .map_err(|_| BayesError::Parse { row : ix_rec + 1, value : entry.to_string() })?;
        values.push(v);
    }
    Ok(values)
}

#[test]
fn parse_column_with_bom() {
    let content = "\u{feff}open,close\n1.5,2\n\u{feff}2.5,3\n";
    let v = parse_numeric_column(content.as_bytes(), "open").unwrap();
    assert_eq!(v, vec![1.5, 2.5]);
}

#[test]
fn missing_column() {
    let content = "open,close\n1,2\n";
    let res = parse_numeric_column(content.as_bytes(), "volume");
    assert!(matches!(res, Err(BayesError::MissingColumn(ref c)) if c == "volume"));
}

#[test]
fn unparsable_value() {
    let content = "open\n1\nabc\n";
    match parse_numeric_column(content.as_bytes(), "open") {
        Err(BayesError::Parse { row, value }) => {
            assert_eq!(row, 2);
            assert_eq!(value, "abc");
        },
        other => panic!("Expected parse error, got {:?}", other)
    }
}
