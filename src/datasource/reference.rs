//! Curated trend prices loaded from a CSV file.
//!
//! Expected header: `set_code,product_type,price`.

use crate::domain::{Decimal, ProductType, ReferencePriceBook, SetCode};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ReferenceFileError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(String),
}

/// Parse trend prices from CSV bytes.
///
/// A later row for the same set and product type overrides an earlier one.
pub fn parse_reference_csv(csv_bytes: &[u8]) -> Result<ReferencePriceBook, ReferenceFileError> {
    #[derive(Debug, serde::Deserialize)]
    struct Row {
        set_code: String,
        product_type: String,
        price: String,
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(csv_bytes);

    let mut book = ReferencePriceBook::new();
    for (line, record) in reader.deserialize::<Row>().enumerate() {
        let row = record.map_err(|e| ReferenceFileError::Csv(e.to_string()))?;
        if row.set_code.is_empty() || row.product_type.is_empty() {
            return Err(ReferenceFileError::Csv(format!(
                "row {}: set_code and product_type are required",
                line + 1
            )));
        }
        let price = Decimal::from_str_canonical(&row.price)
            .map_err(|e| {
                ReferenceFileError::Csv(format!("row {}: invalid price: {}", line + 1, e))
            })?;
        book.insert(
            SetCode::new(row.set_code),
            ProductType::new(row.product_type),
            price,
        );
    }

    Ok(book)
}

/// Load trend prices from a CSV file on disk.
pub fn load_reference_prices(
    path: impl AsRef<Path>,
) -> Result<ReferencePriceBook, ReferenceFileError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ReferenceFileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let book = parse_reference_csv(&bytes)?;
    info!(path = %path.display(), entries = book.len(), "Loaded reference prices");
    Ok(book)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_parse_valid_rows() {
        let csv = b"set_code,product_type,price\nmkm,play,5.49\nMKM, collector ,24.99\nOTJ,play,4.75\n";
        let book = parse_reference_csv(csv).unwrap();
        assert_eq!(book.len(), 3);
        assert_eq!(
            book.trend(&SetCode::from("MKM"), &ProductType::from("play")),
            Some(d("5.49"))
        );
        assert_eq!(
            book.trend(&SetCode::from("mkm"), &ProductType::from("collector")),
            Some(d("24.99"))
        );
    }

    #[test]
    fn test_later_row_overrides() {
        let csv = b"set_code,product_type,price\nMKM,play,5\nMKM,play,6\n";
        let book = parse_reference_csv(csv).unwrap();
        assert_eq!(book.len(), 1);
        assert_eq!(
            book.trend(&SetCode::from("MKM"), &ProductType::from("play")),
            Some(d("6"))
        );
    }

    #[test]
    fn test_invalid_price_errors() {
        let csv = b"set_code,product_type,price\nMKM,play,cheap\n";
        let err = parse_reference_csv(csv).unwrap_err();
        assert!(matches!(err, ReferenceFileError::Csv(_)));
    }

    #[test]
    fn test_missing_column_errors() {
        let csv = b"set_code,price\nMKM,5\n";
        assert!(parse_reference_csv(csv).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"set_code,product_type,price\nBLB,play,4.10\n").unwrap();
        let book = load_reference_prices(file.path()).unwrap();
        assert_eq!(
            book.trend(&SetCode::from("BLB"), &ProductType::from("play")),
            Some(d("4.10"))
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_reference_prices("/nonexistent/trend.csv").unwrap_err();
        assert!(matches!(err, ReferenceFileError::Io { .. }));
    }
}
