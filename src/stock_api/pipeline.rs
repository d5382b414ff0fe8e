use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::market_context::{calculate_period_trends, compare_with_market};
use super::narrative::{fallback_narrative, generate_narrative, NarrativeProvider};
use super::risk_analysis::{collect_signals, synthesize_risk, technical_snapshot};
use super::structure::analyze_structure;
use super::technical_indicators::calculate_indicators;
use super::types::{IndicatorSet, LlmAnalysis, MarketAnalysis, PriceSeries, RiskVerdict, StockAnalysis, StructuralSnapshot};
use crate::config::AnalysisConfig;
use crate::error::Result;

const SOFT_MINIMUMS: [(usize, &str); 3] = [
    (10, "volume regime needs 10 points"),
    (20, "trend strength and MA20 need 20 points"),
    (60, "MA60 and quarterly trend need 60 points"),
];

fn warn_on_short_series(series: &PriceSeries) {
    for (minimum, feature) in SOFT_MINIMUMS {
        if series.len() < minimum {
            warn!(points = series.len(), minimum, "short series: {}", feature);
        }
    }
}

fn market_section(
    series: &PriceSeries,
    benchmark: Option<&PriceSeries>,
    config: &AnalysisConfig,
) -> Option<MarketAnalysis> {
    let index = benchmark?;
    match compare_with_market(series, index, config) {
        Ok(analysis) => Some(analysis),
        Err(e) => {
            warn!("market comparison omitted: {}", e);
            None
        }
    }
}

fn assemble_verdict(
    series: &PriceSeries,
    indicators: &IndicatorSet,
    structure: &StructuralSnapshot,
    llm_analysis: LlmAnalysis,
    market_analysis: Option<MarketAnalysis>,
    config: &AnalysisConfig,
) -> RiskVerdict {
    let signals = collect_signals(series, indicators, structure, config);
    let assessment = synthesize_risk(&signals);

    RiskVerdict {
        risk_level: assessment.risk_level,
        risk_score: assessment.risk_score,
        risk_factors: assessment.risk_factors,
        opportunity_factors: assessment.opportunity_factors,
        trend: structure.trend_strength.as_ref().map(|t| t.trend),
        trend_strength: structure.trend_strength.clone(),
        price_trend: calculate_period_trends(&series.closes(), &config.market_trend_periods),
        volume_analysis: structure.volume_analysis.clone(),
        support_resistance: structure.support_resistance.clone(),
        price_position: structure.price_position.clone(),
        position_advice: assessment.position_advice,
        action_advice: assessment.action_advice,
        technical_indicators: technical_snapshot(indicators, structure),
        llm_analysis,
        market_analysis,
    }
}

fn analyze_core(series: &PriceSeries, config: &AnalysisConfig) -> Result<(IndicatorSet, StructuralSnapshot)> {
    config.validate()?;
    warn_on_short_series(series);
    let indicators = calculate_indicators(series, config);
    let structure = analyze_structure(series, &indicators, config);
    Ok((indicators, structure))
}

/// Full analysis of one security, with the fixed fallback in place of narrative text.
pub fn analyze_stock(
    series: &PriceSeries,
    benchmark: Option<&PriceSeries>,
    config: &AnalysisConfig,
) -> Result<StockAnalysis> {
    let (indicators, structure) = analyze_core(series, config)?;
    let market = market_section(series, benchmark, config);
    let smart_analysis = assemble_verdict(series, &indicators, &structure, fallback_narrative(config), market, config);

    info!(
        points = series.len(),
        score = smart_analysis.risk_score,
        level = ?smart_analysis.risk_level,
        "stock analysis completed"
    );

    Ok(StockAnalysis {
        indicators,
        structure,
        smart_analysis,
    })
}

/// Same as [`analyze_stock`], asking `provider` for the narrative section when one is given.
pub async fn analyze_with_narrative<P: NarrativeProvider>(
    series: &PriceSeries,
    benchmark: Option<&PriceSeries>,
    provider: Option<&P>,
    config: &AnalysisConfig,
) -> Result<StockAnalysis> {
    let (indicators, structure) = analyze_core(series, config)?;
    let llm_analysis = match provider {
        Some(provider) => generate_narrative(provider, series, &indicators, config).await,
        None => fallback_narrative(config),
    };
    let market = market_section(series, benchmark, config);
    let smart_analysis = assemble_verdict(series, &indicators, &structure, llm_analysis, market, config);

    info!(
        points = series.len(),
        score = smart_analysis.risk_score,
        level = ?smart_analysis.risk_level,
        model = %smart_analysis.llm_analysis.model,
        "stock analysis completed"
    );

    Ok(StockAnalysis {
        indicators,
        structure,
        smart_analysis,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub symbol: String,
    pub series: PriceSeries,
}

#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub symbol: String,
    pub analysis: Option<StockAnalysis>,
    pub error: Option<String>,
}

/// Analyzes many securities in parallel against one shared benchmark. Results keep request order.
pub fn analyze_batch(
    requests: &[AnalysisRequest],
    benchmark: Option<&PriceSeries>,
    config: &AnalysisConfig,
) -> Vec<BatchItem> {
    requests
        .par_iter()
        .map(|request| match analyze_stock(&request.series, benchmark, config) {
            Ok(analysis) => BatchItem {
                symbol: request.symbol.clone(),
                analysis: Some(analysis),
                error: None,
            },
            Err(e) => {
                warn!(symbol = %request.symbol, "analysis failed: {}", e);
                BatchItem {
                    symbol: request.symbol.clone(),
                    analysis: None,
                    error: Some(e.to_string()),
                }
            }
        })
        .collect()
}
