use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{AnalysisError, Result};

pub const DEFAULT_NARRATIVE_FALLBACK: &str =
    "AI analysis is temporarily unavailable, please try again later.";

/// Tunable windows and thresholds for the analysis pipeline.
///
/// Every field has a default, so a config file only needs the keys it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub ma_windows: Vec<usize>,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub trading_days: f64,
    pub level_spacing: f64,
    pub max_levels: usize,
    pub near_level_tolerance: f64,
    pub volume_window: usize,
    pub volume_expanding_ratio: f64,
    pub volume_contracting_ratio: f64,
    pub trend_window: usize,
    pub relative_strength_window: usize,
    pub market_trend_periods: Vec<usize>,
    pub narrative_recent_points: usize,
    pub narrative_fallback: String,
    pub narrative_model: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            ma_windows: vec![5, 20, 60],
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            trading_days: 252.0,
            level_spacing: 0.01,
            max_levels: 3,
            near_level_tolerance: 0.02,
            volume_window: 5,
            volume_expanding_ratio: 1.5,
            volume_contracting_ratio: 0.7,
            trend_window: 20,
            relative_strength_window: 20,
            market_trend_periods: vec![1, 5, 20, 60],
            narrative_recent_points: 5,
            narrative_fallback: DEFAULT_NARRATIVE_FALLBACK.to_string(),
            narrative_model: "external".to_string(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ma_windows.iter().any(|&w| w == 0) {
            return Err(AnalysisError::Config("moving-average windows must be positive".into()));
        }
        let windows = [
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("volume_window", self.volume_window),
            ("trend_window", self.trend_window),
            ("relative_strength_window", self.relative_strength_window),
            ("max_levels", self.max_levels),
        ];
        if let Some((name, _)) = windows.iter().find(|(_, v)| *v == 0) {
            return Err(AnalysisError::Config(format!("{} must be positive", name)));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(AnalysisError::Config(format!(
                "macd_fast ({}) must be shorter than macd_slow ({})",
                self.macd_fast, self.macd_slow
            )));
        }
        if self.volume_contracting_ratio >= self.volume_expanding_ratio {
            return Err(AnalysisError::Config(format!(
                "volume_contracting_ratio ({}) must be below volume_expanding_ratio ({})",
                self.volume_contracting_ratio, self.volume_expanding_ratio
            )));
        }
        if !(self.trading_days > 0.0) || !(self.level_spacing >= 0.0) || !(self.near_level_tolerance >= 0.0) {
            return Err(AnalysisError::Config(
                "trading_days must be positive and tolerances non-negative".into(),
            ));
        }
        Ok(())
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AnalysisConfig> {
    let content = fs::read_to_string(path)?;
    let config: AnalysisConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
