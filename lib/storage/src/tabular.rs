// CSV tables: catalog input, product name lists, match results
use carbonmatch_core::{CatalogEntry, Error, MatchResult, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::debug;

use crate::write_atomic;

/// Header names of the catalog CSV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogColumns {
    /// Display name returned in match results
    pub name: String,
    /// Text that is normalized and embedded
    pub text: String,
    pub rating: String,
}

impl Default for CatalogColumns {
    fn default() -> Self {
        Self {
            name: "name".to_string(),
            text: "clean name".to_string(),
            rating: "carbon_rating".to_string(),
        }
    }
}

/// Parse catalog rows from CSV with a header row
pub fn read_catalog<R: io::Read>(reader: R, columns: &CatalogColumns) -> Result<Vec<CatalogEntry>> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers().map_err(csv_error)?.clone();

    let name = column_position(&headers, &columns.name)?;
    let text = column_position(&headers, &columns.text)?;
    let rating = column_position(&headers, &columns.rating)?;

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let field = |i: usize| record.get(i).unwrap_or_default();
        entries.push(CatalogEntry::new(field(name), field(text), field(rating)));
    }
    Ok(entries)
}

/// Read the catalog CSV at `path`
pub fn load_catalog_csv<P: AsRef<Path>>(path: P, columns: &CatalogColumns) -> Result<Vec<CatalogEntry>> {
    let path = path.as_ref();
    let entries = read_catalog(File::open(path)?, columns)?;
    debug!(path = %path.display(), rows = entries.len(), "catalog read");
    Ok(entries)
}

/// Values of one named column, in row order
pub fn read_column<R: io::Read>(reader: R, column: &str) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers().map_err(csv_error)?.clone();
    let position = column_position(&headers, column)?;

    reader
        .records()
        .map(|record| {
            let record = record.map_err(csv_error)?;
            Ok(record.get(position).unwrap_or_default().to_string())
        })
        .collect()
}

/// Product names to match, from the `column` of the CSV at `path`
pub fn load_product_names<P: AsRef<Path>>(path: P, column: &str) -> Result<Vec<String>> {
    read_column(File::open(path.as_ref())?, column)
}

/// Write `input_product,matched_product,carbon_rating` rows
pub fn write_results<W: io::Write>(writer: W, results: &[MatchResult]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    if results.is_empty() {
        writer
            .write_record(RESULT_COLUMNS)
            .map_err(csv_error)?;
    }
    for result in results {
        writer.serialize(result).map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the results CSV to `path` in one atomic replace
pub fn save_results<P: AsRef<Path>>(path: P, results: &[MatchResult]) -> Result<()> {
    let mut buffer = Vec::new();
    write_results(&mut buffer, results)?;
    write_atomic(path.as_ref(), &buffer)
}

const RESULT_COLUMNS: [&str; 3] = ["input_product", "matched_product", "carbon_rating"];

/// Parse a results table.
///
/// Columns are picked by name when the header has `input_product`,
/// `matched_product` and `carbon_rating`, otherwise the first three
/// columns are taken in that order.
pub fn read_results<R: io::Read>(reader: R) -> Result<Vec<MatchResult>> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers().map_err(csv_error)?.clone();
    if headers.len() < RESULT_COLUMNS.len() {
        return Err(Error::Schema(format!(
            "results table needs {} columns, found {} ({})",
            RESULT_COLUMNS.len(),
            headers.len(),
            headers.iter().collect::<Vec<_>>().join(", ")
        )));
    }
    let positions = match RESULT_COLUMNS
        .iter()
        .map(|column| column_position(&headers, column))
        .collect::<Result<Vec<_>>>()
    {
        Ok(named) => named,
        Err(_) => vec![0, 1, 2],
    };

    let mut results = Vec::new();
    for row in reader.records() {
        let record = row.map_err(csv_error)?;
        let field = |i: usize| record.get(positions[i]).unwrap_or_default().to_string();
        results.push(MatchResult {
            input_product: field(0),
            matched_product: field(1),
            carbon_rating: field(2),
        });
    }
    Ok(results)
}

pub fn load_results<P: AsRef<Path>>(path: P) -> Result<Vec<MatchResult>> {
    read_results(File::open(path.as_ref())?)
}

fn column_position(headers: &csv::StringRecord, column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| {
            Error::Schema(format!(
                "missing column '{}' (found: {})",
                column,
                headers.iter().collect::<Vec<_>>().join(", ")
            ))
        })
}

fn csv_error(e: csv::Error) -> Error {
    Error::Csv(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CATALOG: &str = "\
name,clean name,carbon_rating,category
Cherry Tomatoes,cherry tomatoes,A,veg
\"Milk, Whole\",whole milk,C,dairy
";

    #[test]
    fn test_read_catalog() {
        let entries = read_catalog(CATALOG.as_bytes(), &CatalogColumns::default()).unwrap();
        assert_eq!(
            entries,
            vec![
                CatalogEntry::new("Cherry Tomatoes", "cherry tomatoes", "A"),
                CatalogEntry::new("Milk, Whole", "whole milk", "C"),
            ]
        );
    }

    #[test]
    fn test_custom_columns() {
        let columns = CatalogColumns {
            name: "name".to_string(),
            text: "name".to_string(),
            rating: "category".to_string(),
        };
        let entries = read_catalog(CATALOG.as_bytes(), &columns).unwrap();
        assert_eq!(entries[0], CatalogEntry::new("Cherry Tomatoes", "Cherry Tomatoes", "veg"));
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let csv = "name,carbon_rating\nBasil,B\n";
        match read_catalog(csv.as_bytes(), &CatalogColumns::default()).unwrap_err() {
            Error::Schema(msg) => assert!(msg.contains("clean name")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_ragged_row_is_csv_error() {
        let csv = "name,clean name,carbon_rating\nBasil,basil\n";
        let err = read_catalog(csv.as_bytes(), &CatalogColumns::default()).unwrap_err();
        assert!(matches!(err, Error::Csv(_)));
    }

    #[test]
    fn test_read_column() {
        let csv = "id,product_name\n1,Fresh Tomatoes 500g\n2,Oat Milk\n";
        let names = read_column(csv.as_bytes(), "product_name").unwrap();
        assert_eq!(names, vec!["Fresh Tomatoes 500g", "Oat Milk"]);

        assert!(matches!(read_column(csv.as_bytes(), "name"), Err(Error::Schema(_))));
    }

    #[test]
    fn test_results_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output.csv");
        let results = vec![
            MatchResult {
                input_product: "Fresh Tomatoes 500g".to_string(),
                matched_product: "tomato".to_string(),
                carbon_rating: "A".to_string(),
            },
            MatchResult {
                input_product: "Basil, bunch".to_string(),
                matched_product: "basil".to_string(),
                carbon_rating: "B".to_string(),
            },
        ];

        save_results(&path, &results).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("input_product,matched_product,carbon_rating\n"));
        assert_eq!(load_results(&path).unwrap(), results);
    }

    #[test]
    fn test_results_read_by_position_without_known_headers() {
        let csv = "input,match,rating\nFresh Tomatoes 500g,tomato,A\nBasil bunch,basil,B\n";
        let results = read_results(csv.as_bytes()).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].input_product, "Basil bunch");
        assert_eq!(results[1].matched_product, "basil");
        assert_eq!(results[1].carbon_rating, "B");
    }

    #[test]
    fn test_results_named_columns_in_any_order() {
        let csv = "carbon_rating,note,input_product,matched_product\nA,x,Fresh Tomatoes 500g,tomato\n";
        let results = read_results(csv.as_bytes()).unwrap();
        assert_eq!(
            results,
            vec![MatchResult {
                input_product: "Fresh Tomatoes 500g".to_string(),
                matched_product: "tomato".to_string(),
                carbon_rating: "A".to_string(),
            }]
        );
    }

    #[test]
    fn test_results_need_three_columns() {
        let csv = "input_product,matched_product\nFresh Tomatoes,tomato\n";
        assert!(matches!(read_results(csv.as_bytes()), Err(Error::Schema(_))));
    }

    #[test]
    fn test_empty_results_keep_header() {
        let mut buffer = Vec::new();
        write_results(&mut buffer, &[]).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "input_product,matched_product,carbon_rating\n"
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = load_catalog_csv(dir.path().join("nope.csv"), &CatalogColumns::default()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
