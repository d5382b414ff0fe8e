use serde::Serialize;
use tracing::debug;

use super::risk_rules::{evaluate_rules, RiskSignals, NO_SIGNAL_FACTOR};
use super::technical_indicators::latest_informative_rsi;
use super::types::{
    IndicatorSet, PricePosition, PriceSeries, RiskLevel, StructuralSnapshot, TechnicalSnapshot, TrendDirection,
    VolumeTrend,
};
use super::utils::round_to;
use crate::config::AnalysisConfig;

/// Scored part of the verdict, before narrative and market sections are attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub risk_score: i32,
    pub risk_factors: Vec<String>,
    pub opportunity_factors: Vec<String>,
    pub position_advice: String,
    pub action_advice: Vec<String>,
}

pub fn collect_signals(
    series: &PriceSeries,
    indicators: &IndicatorSet,
    structure: &StructuralSnapshot,
    config: &AnalysisConfig,
) -> RiskSignals {
    let volatility = if indicators.daily_volatility > 0.0 {
        Some(indicators.daily_volatility)
    } else {
        None
    };

    RiskSignals {
        close: series.latest().close,
        rsi: latest_informative_rsi(&series.closes(), config.rsi_period),
        volatility,
        ma5: indicators.latest_moving_average(5),
        ma20: indicators.latest_moving_average(20),
        volume_trend: structure.volume_analysis.as_ref().map(|v| v.volume_trend),
        trend: structure.trend_strength.as_ref().map(|t| t.trend),
        trend_strength: structure.trend_strength.as_ref().map(|t| t.strength),
        position: structure.price_position.position,
        position_level: structure.price_position.level,
    }
}

pub fn synthesize_risk(signals: &RiskSignals) -> RiskAssessment {
    let outcome = evaluate_rules(signals);
    let mut risk_factors = outcome.risk_factors;
    let opportunity_factors = outcome.opportunity_factors;

    let mut risk_level = RiskLevel::from_score(outcome.score);
    if risk_factors.is_empty() && opportunity_factors.is_empty() {
        risk_factors.push(NO_SIGNAL_FACTOR.to_string());
        risk_level = RiskLevel::Low;
    }

    debug!(score = outcome.score, level = ?risk_level, fired = ?outcome.fired, "risk rules evaluated");

    RiskAssessment {
        risk_level,
        risk_score: outcome.score,
        risk_factors,
        opportunity_factors,
        position_advice: generate_position_advice(risk_level, signals),
        action_advice: generate_action_advice(risk_level, signals),
    }
}

fn strong_trend(signals: &RiskSignals) -> Option<TrendDirection> {
    match (signals.trend, signals.trend_strength) {
        (Some(direction), Some(strength)) if strength > 0.7 => Some(direction),
        _ => None,
    }
}

pub fn generate_position_advice(risk_level: RiskLevel, signals: &RiskSignals) -> String {
    let mut advice = format!("Keep the position below {}%", risk_level.base_position_percent());

    match strong_trend(signals) {
        Some(TrendDirection::Up) => advice.push_str(", the position can be raised moderately"),
        Some(TrendDirection::Down) => advice.push_str(", consider lowering the position"),
        None => {}
    }

    if signals.volume_trend == Some(VolumeTrend::Expanding) {
        advice.push_str(", watch how volume develops");
    }

    if signals.position != PricePosition::Middle {
        advice.push_str(", watch for a price breakout");
    }

    advice
}

pub fn generate_action_advice(risk_level: RiskLevel, signals: &RiskSignals) -> Vec<String> {
    let mut advices = Vec::new();

    advices.push(
        match strong_trend(signals) {
            Some(TrendDirection::Up) => "The trend is strong, consider buying on dips",
            Some(TrendDirection::Down) => "The downtrend is clear, stay on the sidelines or trim the position",
            None => "The trend is unclear, wait for a clearer signal",
        }
        .to_string(),
    );

    match signals.volume_trend {
        Some(VolumeTrend::Expanding) => {
            if signals.trend == Some(TrendDirection::Up) {
                advices.push("Rising on expanding volume, follow in moderately".to_string());
            } else {
                advices.push("Falling on expanding volume, step aside to avoid risk".to_string());
            }
        }
        Some(VolumeTrend::Contracting) => {
            advices.push("Volume is drying up, wait for volume to return".to_string());
        }
        _ => {}
    }

    let level = signals.position_level.unwrap_or(signals.close);
    match signals.position {
        PricePosition::NearSupport => {
            advices.push(format!("Close to support at {:.2}, a small probing buy can be considered", level));
        }
        PricePosition::NearResistance => {
            advices.push(format!("Close to resistance at {:.2}, set a stop-loss", level));
        }
        PricePosition::Middle => {}
    }

    if risk_level == RiskLevel::High {
        advices.push("Risk is elevated, mostly stay on the sidelines".to_string());
    }

    advices
}

pub fn technical_snapshot(indicators: &IndicatorSet, structure: &StructuralSnapshot) -> TechnicalSnapshot {
    TechnicalSnapshot {
        rsi: indicators.latest_rsi().map(|v| round_to(v, 2)),
        volatility: round_to(indicators.volatility * 100.0, 2),
        ma5: indicators.latest_moving_average(5).map(|v| round_to(v, 2)),
        ma20: indicators.latest_moving_average(20).map(|v| round_to(v, 2)),
        volume_ratio: structure.volume_analysis.as_ref().map(|v| round_to(v.volume_ratio, 2)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals() -> RiskSignals {
        RiskSignals {
            close: 100.0,
            rsi: Some(55.0),
            volatility: Some(0.015),
            ma5: Some(99.0),
            ma20: Some(101.0),
            volume_trend: Some(VolumeTrend::Flat),
            trend: Some(TrendDirection::Up),
            trend_strength: Some(0.4),
            position: PricePosition::Middle,
            position_level: None,
        }
    }

    #[test]
    fn no_factor_forces_low_level() {
        let assessment = synthesize_risk(&signals());
        assert_eq!(assessment.risk_score, 50);
        assert_eq!(assessment.risk_level, RiskLevel::Low);
        assert_eq!(assessment.risk_factors, vec![NO_SIGNAL_FACTOR.to_string()]);
        assert_eq!(assessment.position_advice, "Keep the position below 70%");
        assert_eq!(assessment.action_advice, vec!["The trend is unclear, wait for a clearer signal".to_string()]);
    }

    #[test]
    fn medium_score_keeps_medium_level() {
        let s = RiskSignals {
            volatility: Some(0.005),
            ..signals()
        };
        let assessment = synthesize_risk(&s);
        assert_eq!(assessment.risk_score, 50);
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
        assert!(assessment.position_advice.starts_with("Keep the position below 50%"));
    }

    #[test]
    fn high_risk_adds_caution_line() {
        let s = RiskSignals {
            rsi: Some(82.0),
            volatility: Some(0.04),
            volume_trend: Some(VolumeTrend::Expanding),
            trend: Some(TrendDirection::Down),
            trend_strength: Some(0.8),
            position: PricePosition::NearResistance,
            position_level: Some(101.0),
            ..signals()
        };
        let assessment = synthesize_risk(&s);
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert_eq!(
            assessment.position_advice,
            "Keep the position below 30%, consider lowering the position, watch how volume develops, watch for a price breakout"
        );
        assert_eq!(assessment.action_advice.len(), 4);
        assert!(assessment.action_advice[0].starts_with("The downtrend is clear"));
        assert!(assessment.action_advice[1].starts_with("Falling on expanding volume"));
        assert!(assessment.action_advice[2].contains("101.00"));
        assert_eq!(assessment.action_advice[3], "Risk is elevated, mostly stay on the sidelines");
    }

    #[test]
    fn strong_uptrend_near_support() {
        let s = RiskSignals {
            volume_trend: Some(VolumeTrend::Contracting),
            trend_strength: Some(0.9),
            position: PricePosition::NearSupport,
            position_level: Some(98.5),
            ..signals()
        };
        let assessment = synthesize_risk(&s);
        // contracting volume on a rise: +10
        assert_eq!(assessment.risk_score, 60);
        assert_eq!(
            assessment.position_advice,
            "Keep the position below 50%, the position can be raised moderately, watch for a price breakout"
        );
        assert_eq!(
            assessment.action_advice,
            vec![
                "The trend is strong, consider buying on dips".to_string(),
                "Volume is drying up, wait for volume to return".to_string(),
                "Close to support at 98.50, a small probing buy can be considered".to_string(),
            ]
        );
    }
}
