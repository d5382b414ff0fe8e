use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::technical_indicators::{calculate_gain_loss, calculate_macd, calculate_volatility, rsi_from_averages};
use super::types::{MacdSnapshot, MacdTrend, PricePosition, PriceSeries, RiskLevel, TrendDirection};
use super::utils::{finite, linear_regression, percentile, round_to};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};

const SHORT_TERM_LOOKBACK: usize = 5;
const BAND_PROXIMITY: f64 = 0.3;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    fn from_strength(strength: f64) -> Self {
        if strength > 0.7 {
            Confidence::High
        } else if strength > 0.3 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RegressionTrend {
    pub direction: TrendDirection,
    pub strength: f64,
    pub slope: f64,
    pub r_squared: f64,
    pub short_term_change: f64,
    pub confidence: Confidence,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PriceRange {
    pub max: f64,
    pub min: f64,
    pub range_percent: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VolatilityProfile {
    pub annual_volatility: f64,
    pub price_range: PriceRange,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PercentileLevels {
    pub support: f64,
    pub resistance: f64,
    pub position: PricePosition,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RsiCondition {
    Overbought,
    Oversold,
    Neutral,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RsiReading {
    pub value: f64,
    pub condition: RsiCondition,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IndicatorConditions {
    pub macd: MacdSnapshot,
    pub rsi: Option<RsiReading>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Suggestion {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OverviewReport {
    pub trend: RegressionTrend,
    pub volatility: VolatilityProfile,
    pub support_resistance: PercentileLevels,
    pub technical_indicators: IndicatorConditions,
    pub suggestion: Suggestion,
    pub summary: String,
}

pub fn analyze(series: &PriceSeries, config: &AnalysisConfig) -> Result<OverviewReport> {
    let closes = series.closes();

    let trend = analyze_regression_trend(&closes)?;
    let volatility = analyze_volatility_profile(series, config);
    let support_resistance = percentile_levels(&closes)?;
    let technical_indicators = indicator_conditions(&closes, config);

    let suggestion = suggest(&trend, &technical_indicators, support_resistance.position);
    let summary = summarize(&trend, &volatility, &support_resistance, &technical_indicators, suggestion);

    info!(points = closes.len(), suggestion = ?suggestion, "overview analysis completed");

    Ok(OverviewReport {
        trend,
        volatility,
        support_resistance,
        technical_indicators,
        suggestion,
        summary,
    })
}

pub fn analyze_regression_trend(closes: &[f64]) -> Result<RegressionTrend> {
    let fit = linear_regression(closes).ok_or_else(|| AnalysisError::insufficient("regression trend", 2, closes.len()))?;
    let strength = fit.r_value.abs();

    let n = closes.len();
    let short_term_change = if n >= SHORT_TERM_LOOKBACK {
        let base = closes[n - SHORT_TERM_LOOKBACK];
        (closes[n - 1] - base) / base * 100.0
    } else {
        0.0
    };

    debug!(slope = fit.slope, intercept = fit.intercept, r = fit.r_value, "regression fitted");

    Ok(RegressionTrend {
        direction: if fit.slope > 0.0 { TrendDirection::Up } else { TrendDirection::Down },
        strength,
        slope: fit.slope,
        r_squared: fit.r_value * fit.r_value,
        short_term_change,
        confidence: Confidence::from_strength(strength),
    })
}

pub fn analyze_volatility_profile(series: &PriceSeries, config: &AnalysisConfig) -> VolatilityProfile {
    let annual_volatility = calculate_volatility(&series.closes(), config.trading_days);

    let points = series.points();
    let max = points.iter().map(|p| p.high).fold(f64::MIN, f64::max);
    let min = points.iter().map(|p| p.low).fold(f64::MAX, f64::min);

    let risk_level = if annual_volatility > 0.3 {
        RiskLevel::High
    } else if annual_volatility > 0.15 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    VolatilityProfile {
        annual_volatility,
        price_range: PriceRange {
            max,
            min,
            range_percent: (max - min) / min * 100.0,
        },
        risk_level,
    }
}

/// 25th/75th close percentiles as a support/resistance band.
pub fn percentile_levels(closes: &[f64]) -> Result<PercentileLevels> {
    let support = percentile(closes, 25.0).ok_or(AnalysisError::EmptySeries)?;
    let resistance = percentile(closes, 75.0).ok_or(AnalysisError::EmptySeries)?;
    let current = closes[closes.len() - 1];

    let band = (resistance - support) * BAND_PROXIMITY;
    let position = if current - support < band {
        PricePosition::NearSupport
    } else if resistance - current < band {
        PricePosition::NearResistance
    } else {
        PricePosition::Middle
    };

    Ok(PercentileLevels {
        support: round_to(support, 2),
        resistance: round_to(resistance, 2),
        position,
    })
}

/// RSI over a full `period` window; `None` until the window fills or when it saw no movement.
fn full_window_rsi(closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() <= period {
        return None;
    }
    let (gain, loss) = calculate_gain_loss(closes, period).last().copied().flatten()?;
    if gain == 0.0 && loss == 0.0 {
        return None;
    }
    finite(rsi_from_averages(gain, loss))
}

pub fn indicator_conditions(closes: &[f64], config: &AnalysisConfig) -> IndicatorConditions {
    let macd = calculate_macd(closes, config.macd_fast, config.macd_slow, config.macd_signal)
        .latest()
        .map(|m| MacdSnapshot {
            value: round_to(m.value, 3),
            signal: round_to(m.signal, 3),
            histogram: round_to(m.histogram, 3),
            trend: m.trend,
        })
        .unwrap_or(MacdSnapshot {
            value: 0.0,
            signal: 0.0,
            histogram: 0.0,
            trend: MacdTrend::Bearish,
        });

    let rsi = full_window_rsi(closes, config.rsi_period).map(|value| RsiReading {
        value: round_to(value, 2),
        condition: if value > 70.0 {
            RsiCondition::Overbought
        } else if value < 30.0 {
            RsiCondition::Oversold
        } else {
            RsiCondition::Neutral
        },
    });

    IndicatorConditions { macd, rsi }
}

pub fn suggest(trend: &RegressionTrend, indicators: &IndicatorConditions, position: PricePosition) -> Suggestion {
    let mut votes: Vec<i32> = Vec::new();

    if trend.confidence == Confidence::High {
        votes.push(match trend.direction {
            TrendDirection::Up => 1,
            TrendDirection::Down => -1,
        });
    }

    match indicators.rsi.as_ref().map(|r| r.condition) {
        Some(RsiCondition::Oversold) => votes.push(1),
        Some(RsiCondition::Overbought) => votes.push(-1),
        _ => {}
    }

    votes.push(match indicators.macd.trend {
        MacdTrend::Bullish => 1,
        MacdTrend::Bearish => -1,
    });

    match position {
        PricePosition::NearSupport => votes.push(1),
        PricePosition::NearResistance => votes.push(-1),
        PricePosition::Middle => {}
    }

    let average = votes.iter().sum::<i32>() as f64 / votes.len() as f64;
    if average > 0.5 {
        Suggestion::Buy
    } else if average < -0.5 {
        Suggestion::Sell
    } else {
        Suggestion::Hold
    }
}

fn risk_label(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High => "high",
        RiskLevel::Medium => "medium",
        RiskLevel::Low => "low",
    }
}

fn macd_label(trend: MacdTrend) -> &'static str {
    match trend {
        MacdTrend::Bullish => "bullish",
        MacdTrend::Bearish => "bearish",
    }
}

fn summarize(
    trend: &RegressionTrend,
    volatility: &VolatilityProfile,
    levels: &PercentileLevels,
    indicators: &IndicatorConditions,
    suggestion: Suggestion,
) -> String {
    let mut summary = Vec::new();

    let confidence = match trend.confidence {
        Confidence::High => "high",
        Confidence::Medium => "medium",
        Confidence::Low => "low",
    };
    summary.push(format!(
        "The stock is in a {} with strength {:.2} and {} confidence.",
        match trend.direction {
            TrendDirection::Up => "rising trend",
            TrendDirection::Down => "falling trend",
        },
        trend.strength,
        confidence
    ));

    summary.push(format!(
        "Volatility risk is {}, annualized volatility {:.2}%.",
        risk_label(volatility.risk_level),
        volatility.annual_volatility * 100.0
    ));

    let position = match levels.position {
        PricePosition::NearSupport => "close to support",
        PricePosition::NearResistance => "close to resistance",
        PricePosition::Middle => "in the middle of the range",
    };
    summary.push(format!(
        "Price is {}, support {:.2}, resistance {:.2}.",
        position, levels.support, levels.resistance
    ));

    let macd = macd_label(indicators.macd.trend);
    match &indicators.rsi {
        Some(rsi) => {
            let condition = match rsi.condition {
                RsiCondition::Overbought => "overbought",
                RsiCondition::Oversold => "oversold",
                RsiCondition::Neutral => "neutral",
            };
            summary.push(format!("RSI is {:.2} ({}); MACD shows a {} signal.", rsi.value, condition, macd));
        }
        None => summary.push(format!("MACD shows a {} signal.", macd)),
    }

    summary.push(
        match suggestion {
            Suggestion::Buy => "Overall: consider buying.",
            Suggestion::Sell => "Overall: consider selling.",
            Suggestion::Hold => "Overall: wait and watch.",
        }
        .to_string(),
    );

    summary.join(" ")
}
