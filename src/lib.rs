pub mod commands;
pub mod config;
pub mod error;
pub mod stock_api;

pub use config::{load_config, AnalysisConfig};
pub use error::{AnalysisError, Result};
pub use stock_api::{analyze_batch, analyze_stock, analyze_with_narrative, PriceSeries, StockAnalysis};
