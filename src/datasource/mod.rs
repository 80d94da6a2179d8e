//! Data source abstraction for loading dataset documents.
//!
//! The valuation core never performs I/O; everything it consumes comes through
//! this trait, one document per call.

use crate::domain::{DatasetMeta, PriceTable, SetCode, SetDetail, SetSummary};
use async_trait::async_trait;
use std::fmt;

pub mod http;
pub mod mock;
pub mod reference;

pub use http::HttpDataSource;
pub use mock::MockDataSource;
pub use reference::{load_reference_prices, parse_reference_csv, ReferenceFileError};

/// Data source trait for fetching the dataset documents.
///
/// Implementations own retry/backoff; callers see one result per document.
#[async_trait]
pub trait DataSource: Send + Sync + fmt::Debug {
    /// Fetch the list of every published set.
    async fn fetch_set_list(&self) -> Result<Vec<SetSummary>, DataSourceError>;

    /// Fetch the full document of one set: cards, booster tables, sealed products.
    ///
    /// # Arguments
    /// * `code` - Set code; implementations look it up in canonical (upper-case) form
    async fn fetch_set_detail(&self, code: &SetCode) -> Result<SetDetail, DataSourceError>;

    /// Fetch today's price snapshot for every card and sealed product.
    async fn fetch_prices(&self) -> Result<PriceTable, DataSourceError>;

    /// Fetch the dataset build stamp.
    async fn fetch_meta(&self) -> Result<DatasetMeta, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 5xx server error, unexpected 4xx)
    HttpError { status: u16, message: String },
    /// The requested document does not exist upstream
    NotFound(String),
    /// Parsing error (invalid JSON or malformed document)
    ParseError(String),
    /// Rate limit exceeded
    RateLimited,
    /// Other error
    Other(String),
}

impl DataSourceError {
    /// True for failures worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            DataSourceError::NetworkError(_) | DataSourceError::RateLimited => true,
            DataSourceError::HttpError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::NotFound(what) => write!(f, "Not found: {}", what),
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datasource_error_display() {
        let err = DataSourceError::NetworkError("connection timeout".to_string());
        assert_eq!(err.to_string(), "Network error: connection timeout");

        let err = DataSourceError::HttpError {
            status: 503,
            message: "Server error".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 503: Server error");

        let err = DataSourceError::NotFound("ZZZ.json".to_string());
        assert_eq!(err.to_string(), "Not found: ZZZ.json");

        let err = DataSourceError::ParseError("invalid JSON".to_string());
        assert_eq!(err.to_string(), "Parse error: invalid JSON");

        let err = DataSourceError::RateLimited;
        assert_eq!(err.to_string(), "Rate limited");
    }

    #[test]
    fn test_transient_classification() {
        assert!(DataSourceError::RateLimited.is_transient());
        assert!(DataSourceError::NetworkError("reset".into()).is_transient());
        assert!(DataSourceError::HttpError {
            status: 502,
            message: String::new()
        }
        .is_transient());
        assert!(!DataSourceError::HttpError {
            status: 400,
            message: String::new()
        }
        .is_transient());
        assert!(!DataSourceError::NotFound("x".into()).is_transient());
        assert!(!DataSourceError::ParseError("x".into()).is_transient());
    }
}
