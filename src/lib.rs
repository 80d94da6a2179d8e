pub mod api;
pub mod cache;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use cache::{PersistentStore, ValuationCache};
pub use config::Config;
pub use datasource::{DataSource, DataSourceError, HttpDataSource, MockDataSource};
pub use domain::{
    CardId, Decimal, Finish, Medium, PriceTable, ProductType, ProductValuation, Quote, Ranking,
    RankingRow, ReferencePriceBook, SetCode, SetDetail, Vendor,
};
pub use engine::{FinishPreference, PriceResolver, ProductValuator, RankingEngine, SheetValuator};
pub use error::AppError;
pub use orchestration::{DatasetLoader, ValuationService};
