use crate::domain::{Decimal, ProductType};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub dataset_url: String,
    pub cache_db_path: Option<String>,
    pub cache_max_entry_bytes: usize,
    pub dataset_ttl: Duration,
    pub valuation_ttl: Duration,
    pub min_price: Decimal,
    pub years_back: u32,
    pub ranking_product_types: Vec<ProductType>,
    pub ranking_limit: usize,
    pub valuation_batch_size: usize,
    pub reference_prices_file: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "PORT", "8080", "must be a valid u16")?;

        let dataset_url = env_map
            .get("DATASET_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnv("DATASET_URL".to_string()))?;

        let cache_db_path = optional(&env_map, "CACHE_DB_PATH");

        let cache_max_entry_bytes = parse_or(
            &env_map,
            "CACHE_MAX_ENTRY_BYTES",
            "4194304",
            "must be a byte count",
        )?;

        let dataset_ttl = Duration::from_secs(parse_or(
            &env_map,
            "DATASET_TTL_SECS",
            "86400",
            "must be a number of seconds",
        )?);

        let valuation_ttl = Duration::from_secs(parse_or(
            &env_map,
            "VALUATION_TTL_SECS",
            "3600",
            "must be a number of seconds",
        )?);

        let min_price = env_map
            .get("MIN_PRICE")
            .map(|s| s.as_str())
            .unwrap_or("0")
            .parse::<Decimal>()
            .map_err(|_| {
                ConfigError::InvalidValue("MIN_PRICE".to_string(), "must be a decimal".to_string())
            })?;
        if min_price < Decimal::zero() {
            return Err(ConfigError::InvalidValue(
                "MIN_PRICE".to_string(),
                "must not be negative".to_string(),
            ));
        }

        let years_back = parse_or(&env_map, "YEARS_BACK", "5", "must be a whole number of years")?;

        let ranking_product_types: Vec<ProductType> = env_map
            .get("RANKING_PRODUCT_TYPES")
            .map(|s| s.as_str())
            .unwrap_or("play,draft,set")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ProductType::from)
            .collect();
        if ranking_product_types.is_empty() {
            return Err(ConfigError::InvalidValue(
                "RANKING_PRODUCT_TYPES".to_string(),
                "must list at least one product type".to_string(),
            ));
        }

        let ranking_limit = parse_or(&env_map, "RANKING_LIMIT", "10", "must be a valid usize")?;

        let valuation_batch_size: usize = parse_or(
            &env_map,
            "VALUATION_BATCH_SIZE",
            "8",
            "must be a valid usize",
        )?;
        if valuation_batch_size == 0 {
            return Err(ConfigError::InvalidValue(
                "VALUATION_BATCH_SIZE".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let reference_prices_file = optional(&env_map, "REFERENCE_PRICES_FILE");

        Ok(Config {
            port,
            dataset_url,
            cache_db_path,
            cache_max_entry_bytes,
            dataset_ttl,
            valuation_ttl,
            min_price,
            years_back,
            ranking_product_types,
            ranking_limit,
            valuation_batch_size,
            reference_prices_file,
        })
    }

    /// Defaults for everything except the dataset location.
    pub fn with_dataset_url(dataset_url: impl Into<String>) -> Self {
        Config {
            port: 8080,
            dataset_url: dataset_url.into(),
            cache_db_path: None,
            cache_max_entry_bytes: crate::cache::DEFAULT_MAX_PERSISTED_BYTES,
            dataset_ttl: Duration::from_secs(86_400),
            valuation_ttl: Duration::from_secs(3_600),
            min_price: Decimal::zero(),
            years_back: 5,
            ranking_product_types: crate::engine::default_product_types(),
            ranking_limit: crate::engine::DEFAULT_RANKING_LIMIT,
            valuation_batch_size: 8,
            reference_prices_file: None,
        }
    }
}

fn optional(env_map: &HashMap<String, String>, name: &str) -> Option<String> {
    env_map
        .get(name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_or<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    name: &str,
    default: &str,
    reason: &str,
) -> Result<T, ConfigError> {
    env_map
        .get(name)
        .map(|s| s.trim())
        .unwrap_or(default)
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(name.to_string(), reason.to_string()))
}
