use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{AnalysisError, Result};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub change: f64, // percent, close vs open
}

impl PricePoint {
    /// Builds a point whose `change` is derived from open and close.
    pub fn with_derived_change(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        let change = if open != 0.0 { (close - open) / open * 100.0 } else { 0.0 };
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
            change,
        }
    }

    fn check(&self, index: usize) -> Result<()> {
        let prices = [("open", self.open), ("high", self.high), ("low", self.low), ("close", self.close)];
        for (name, value) in prices {
            if !value.is_finite() || value <= 0.0 {
                return Err(AnalysisError::MalformedInput {
                    index,
                    reason: format!("{} must be a positive number, got {}", name, value),
                });
            }
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(AnalysisError::MalformedInput {
                index,
                reason: format!("volume must be non-negative, got {}", self.volume),
            });
        }
        if !self.change.is_finite() {
            return Err(AnalysisError::MalformedInput {
                index,
                reason: "change must be a finite percentage".to_string(),
            });
        }
        Ok(())
    }
}

/// Validated, chronologically ascending daily series with at least one point.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(try_from = "Vec<PricePoint>", into = "Vec<PricePoint>")]
pub struct PriceSeries(Vec<PricePoint>);

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(AnalysisError::EmptySeries);
        }
        for (index, point) in points.iter().enumerate() {
            point.check(index)?;
            if index > 0 {
                let previous = &points[index - 1];
                if point.date <= previous.date {
                    return Err(AnalysisError::NonChronological {
                        index,
                        previous: previous.date.to_string(),
                        current: point.date.to_string(),
                    });
                }
            }
        }
        Ok(Self(points))
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    // Always false for a constructed series.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn latest(&self) -> &PricePoint {
        &self.0[self.0.len() - 1]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.0.iter().map(|d| d.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.0.iter().map(|d| d.volume).collect()
    }

    /// The last `count` points, or the whole series when shorter.
    pub fn tail(&self, count: usize) -> &[PricePoint] {
        &self.0[self.0.len().saturating_sub(count)..]
    }
}

impl TryFrom<Vec<PricePoint>> for PriceSeries {
    type Error = AnalysisError;

    fn try_from(points: Vec<PricePoint>) -> Result<Self> {
        PriceSeries::new(points)
    }
}

impl From<PriceSeries> for Vec<PricePoint> {
    fn from(series: PriceSeries) -> Self {
        series.0
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MacdTrend {
    Bullish,
    Bearish,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MacdSnapshot {
    pub value: f64,
    pub signal: f64,
    pub histogram: f64,
    pub trend: MacdTrend,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IndicatorSet {
    /// Keyed by label (`MA5`, `MA20`, ...), each aligned with the series.
    pub moving_averages: BTreeMap<String, Vec<Option<f64>>>,
    pub rsi: Vec<Option<f64>>,
    /// Annualized standard deviation of daily returns.
    pub volatility: f64,
    /// Same measure before annualization.
    pub daily_volatility: f64,
    pub macd: MacdSnapshot,
}

impl IndicatorSet {
    pub fn moving_average(&self, window: usize) -> Option<&[Option<f64>]> {
        self.moving_averages.get(&ma_label(window)).map(|v| v.as_slice())
    }

    pub fn latest_moving_average(&self, window: usize) -> Option<f64> {
        self.moving_average(window).and_then(|v| v.last().copied().flatten())
    }

    pub fn latest_rsi(&self) -> Option<f64> {
        self.rsi.last().copied().flatten()
    }
}

pub fn ma_label(window: usize) -> String {
    format!("MA{}", window)
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SupportResistance {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PricePosition {
    NearSupport,
    NearResistance,
    Middle,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PositionAnalysis {
    pub position: PricePosition,
    pub level: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VolumeTrend {
    Expanding,
    Contracting,
    Flat,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VolumeAnalysis {
    pub volume_ratio: f64,
    pub volume_trend: VolumeTrend,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrendStrength {
    pub trend: TrendDirection,
    pub strength: f64,
    pub direction_consistency: f64,
    pub ma_distance: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StructuralSnapshot {
    pub support_resistance: SupportResistance,
    pub price_position: PositionAnalysis,
    pub volume_analysis: Option<VolumeAnalysis>,
    pub trend_strength: Option<TrendStrength>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PeriodTrend {
    pub name: String,
    pub days: usize,
    pub change: f64,
    pub trend: TrendDirection,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SentimentState {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SentimentMetrics {
    pub up_days_ratio: f64,
    pub volume_ratio: f64,
    pub volatility: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MarketSentiment {
    pub score: i32,
    pub state: SentimentState,
    pub factors: Vec<String>,
    pub metrics: SentimentMetrics,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MarketContext {
    /// Keyed by period name (`daily`, `weekly`, ...).
    pub trends: BTreeMap<String, PeriodTrend>,
    pub strength: TrendStrength,
    pub sentiment: MarketSentiment,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MarketAnalysis {
    pub market_analysis: MarketContext,
    pub relative_strength: f64,
    pub conclusions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: i32) -> Self {
        if score >= 70 {
            RiskLevel::High
        } else if score <= 30 {
            RiskLevel::Low
        } else {
            RiskLevel::Medium
        }
    }

    pub fn base_position_percent(&self) -> u32 {
        match self {
            RiskLevel::High => 30,
            RiskLevel::Medium => 50,
            RiskLevel::Low => 70,
        }
    }
}

/// Latest readings shown alongside the verdict, rounded for display.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TechnicalSnapshot {
    pub rsi: Option<f64>,
    pub volatility: f64, // annualized, percent
    pub ma5: Option<f64>,
    pub ma20: Option<f64>,
    pub volume_ratio: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LlmAnalysis {
    pub llm_analysis: String,
    pub analysis_type: String,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RiskVerdict {
    pub risk_level: RiskLevel,
    pub risk_score: i32,
    pub risk_factors: Vec<String>,
    pub opportunity_factors: Vec<String>,
    pub trend: Option<TrendDirection>,
    pub trend_strength: Option<TrendStrength>,
    pub price_trend: Vec<PeriodTrend>,
    pub volume_analysis: Option<VolumeAnalysis>,
    pub support_resistance: SupportResistance,
    pub price_position: PositionAnalysis,
    pub position_advice: String,
    pub action_advice: Vec<String>,
    pub technical_indicators: TechnicalSnapshot,
    pub llm_analysis: LlmAnalysis,
    pub market_analysis: Option<MarketAnalysis>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StockAnalysis {
    pub indicators: IndicatorSet,
    pub structure: StructuralSnapshot,
    pub smart_analysis: RiskVerdict,
}
