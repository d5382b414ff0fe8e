use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::stock_api::overview::{self, OverviewReport};
use crate::stock_api::{
    analyze_batch, analyze_stock, analyze_with_narrative, calculate_indicators, AnalysisRequest, BatchItem,
    ChatNarrator, IndicatorSet, PriceSeries, StockAnalysis,
};

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CommandResponse<T> {
    Success { data: T },
    Error { message: String },
}

impl<T> From<Result<T>> for CommandResponse<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => CommandResponse::Success { data },
            Err(e) => CommandResponse::Error { message: e.to_string() },
        }
    }
}

pub fn load_series<P: AsRef<Path>>(path: P) -> Result<PriceSeries> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn load_benchmark(path: Option<&Path>) -> Option<PriceSeries> {
    let path = path?;
    match load_series(path) {
        Ok(series) => Some(series),
        Err(e) => {
            warn!(path = %path.display(), "benchmark unavailable: {}", e);
            None
        }
    }
}

pub fn calculate_technical_indicators(input: &Path, config: &AnalysisConfig) -> CommandResponse<IndicatorSet> {
    load_series(input)
        .map(|series| calculate_indicators(&series, config))
        .into()
}

pub async fn analyze_stock_risk(
    input: &Path,
    benchmark: Option<&Path>,
    narrator: Option<&ChatNarrator>,
    config: &AnalysisConfig,
) -> CommandResponse<StockAnalysis> {
    let series = match load_series(input) {
        Ok(series) => series,
        Err(e) => return CommandResponse::Error { message: e.to_string() },
    };
    let benchmark = load_benchmark(benchmark);

    match narrator {
        Some(narrator) => analyze_with_narrative(&series, benchmark.as_ref(), Some(narrator), config).await,
        None => analyze_stock(&series, benchmark.as_ref(), config),
    }
    .into()
}

pub fn overview_analysis(input: &Path, config: &AnalysisConfig) -> CommandResponse<OverviewReport> {
    load_series(input)
        .and_then(|series| overview::analyze(&series, config))
        .into()
}

/// Input is a JSON array of `{symbol, series}` requests.
pub fn batch_analysis(input: &Path, benchmark: Option<&Path>, config: &AnalysisConfig) -> CommandResponse<Vec<BatchItem>> {
    let requests: Result<Vec<AnalysisRequest>> = fs::read_to_string(input)
        .map_err(Into::into)
        .and_then(|content| serde_json::from_str(&content).map_err(Into::into));

    match requests {
        Ok(requests) => {
            let benchmark = load_benchmark(benchmark);
            CommandResponse::Success {
                data: analyze_batch(&requests, benchmark.as_ref(), config),
            }
        }
        Err(e) => CommandResponse::Error { message: e.to_string() },
    }
}
