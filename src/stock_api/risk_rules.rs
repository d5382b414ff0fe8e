use super::types::{PricePosition, TrendDirection, VolumeTrend};

pub const BASE_RISK_SCORE: i32 = 50;
pub const NO_SIGNAL_FACTOR: &str = "No significant risk signal detected";

/// Latest readings the rules are evaluated against.
///
/// `rsi` and `volatility` are `None` when the series gave no usable reading (too short, or no
/// price movement at all), in which case the rules that read them do not fire.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskSignals {
    pub close: f64,
    pub rsi: Option<f64>,
    /// Daily standard deviation of returns, as a fraction.
    pub volatility: Option<f64>,
    pub ma5: Option<f64>,
    pub ma20: Option<f64>,
    pub volume_trend: Option<VolumeTrend>,
    pub trend: Option<TrendDirection>,
    pub trend_strength: Option<f64>,
    pub position: PricePosition,
    pub position_level: Option<f64>,
}

impl RiskSignals {
    fn strong_trend(&self, direction: TrendDirection) -> bool {
        self.trend == Some(direction) && self.trend_strength.map_or(false, |s| s > 0.7)
    }

    fn volume_with_trend(&self, volume: VolumeTrend, direction: TrendDirection) -> bool {
        self.volume_trend == Some(volume) && self.trend == Some(direction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Risk,
    Opportunity,
}

pub struct RiskRule {
    pub name: &'static str,
    pub delta: i32,
    pub bucket: Bucket,
    pub applies: fn(&RiskSignals) -> bool,
    pub describe: fn(&RiskSignals) -> String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub score: i32,
    pub fired: Vec<&'static str>,
    pub risk_factors: Vec<String>,
    pub opportunity_factors: Vec<String>,
}

fn rsi_value(s: &RiskSignals) -> f64 {
    s.rsi.unwrap_or_default()
}

fn volatility_percent(s: &RiskSignals) -> f64 {
    s.volatility.unwrap_or_default() * 100.0
}

fn level(s: &RiskSignals) -> f64 {
    s.position_level.unwrap_or(s.close)
}

fn strength(s: &RiskSignals) -> f64 {
    s.trend_strength.unwrap_or_default()
}

fn bearish_stack(s: &RiskSignals) -> bool {
    matches!((s.ma5, s.ma20), (Some(ma5), Some(ma20)) if s.close < ma5 && ma5 < ma20)
}

fn bullish_stack(s: &RiskSignals) -> bool {
    matches!((s.ma5, s.ma20), (Some(ma5), Some(ma20)) if s.close > ma5 && ma5 > ma20)
}

/// Evaluated in this order, every rule independently.
pub const RISK_RULES: &[RiskRule] = &[
    RiskRule {
        name: "rsi_overbought",
        delta: 20,
        bucket: Bucket::Risk,
        applies: |s| s.rsi.map_or(false, |v| v > 70.0),
        describe: |s| format!("RSI overbought ({:.2} > 70), a pullback is possible", rsi_value(s)),
    },
    RiskRule {
        name: "rsi_oversold",
        delta: -10,
        bucket: Bucket::Opportunity,
        applies: |s| s.rsi.map_or(false, |v| v < 30.0),
        describe: |s| format!("RSI oversold ({:.2} < 30), a rebound is possible", rsi_value(s)),
    },
    RiskRule {
        name: "high_volatility",
        delta: 15,
        bucket: Bucket::Risk,
        applies: |s| s.volatility.map_or(false, |v| v > 0.03),
        describe: |s| format!("High volatility ({:.2}%), keep position size under control", volatility_percent(s)),
    },
    RiskRule {
        name: "low_volatility",
        delta: 0,
        bucket: Bucket::Opportunity,
        applies: |s| s.volatility.map_or(false, |v| v < 0.01),
        describe: |s| format!("Low volatility ({:.2}%), a breakout may be building", volatility_percent(s)),
    },
    RiskRule {
        name: "bearish_ma_stack",
        delta: 15,
        bucket: Bucket::Risk,
        applies: bearish_stack,
        describe: |_| "Price is below both moving averages, a downtrend may be under way".to_string(),
    },
    RiskRule {
        name: "bullish_ma_stack",
        delta: -10,
        bucket: Bucket::Opportunity,
        applies: bullish_stack,
        describe: |_| "Price is above both moving averages, an uptrend may be under way".to_string(),
    },
    RiskRule {
        name: "expanding_volume_rise",
        delta: -10,
        bucket: Bucket::Opportunity,
        applies: |s| s.volume_with_trend(VolumeTrend::Expanding, TrendDirection::Up),
        describe: |_| "Rising on expanding volume, the uptrend is confirmed".to_string(),
    },
    RiskRule {
        name: "expanding_volume_decline",
        delta: 15,
        bucket: Bucket::Risk,
        applies: |s| s.volume_with_trend(VolumeTrend::Expanding, TrendDirection::Down),
        describe: |_| "Falling on expanding volume, the downtrend is confirmed".to_string(),
    },
    RiskRule {
        name: "contracting_volume_rise",
        delta: 10,
        bucket: Bucket::Risk,
        applies: |s| s.volume_with_trend(VolumeTrend::Contracting, TrendDirection::Up),
        describe: |_| "Rising on shrinking volume, upward momentum is weak".to_string(),
    },
    RiskRule {
        name: "contracting_volume_decline",
        delta: -5,
        bucket: Bucket::Opportunity,
        applies: |s| s.volume_with_trend(VolumeTrend::Contracting, TrendDirection::Down),
        describe: |_| "Falling on shrinking volume, downward momentum is fading".to_string(),
    },
    RiskRule {
        name: "strong_downtrend",
        delta: 20,
        bucket: Bucket::Risk,
        applies: |s| s.strong_trend(TrendDirection::Down),
        describe: |s| format!("Strong downtrend, trend strength {:.2}", strength(s)),
    },
    RiskRule {
        name: "strong_uptrend",
        delta: 0,
        bucket: Bucket::Opportunity,
        applies: |s| s.strong_trend(TrendDirection::Up),
        describe: |s| format!("Strong uptrend, trend strength {:.2}", strength(s)),
    },
    RiskRule {
        name: "near_support",
        delta: 0,
        bucket: Bucket::Opportunity,
        applies: |s| s.position == PricePosition::NearSupport,
        describe: |s| format!("Close to support at {:.2}, a rebound is possible", level(s)),
    },
    RiskRule {
        name: "near_resistance",
        delta: 10,
        bucket: Bucket::Risk,
        applies: |s| s.position == PricePosition::NearResistance,
        describe: |s| format!("Close to resistance at {:.2}, wait for a confirmed breakout", level(s)),
    },
];

pub fn evaluate_rules(signals: &RiskSignals) -> RuleOutcome {
    let mut outcome = RuleOutcome {
        score: BASE_RISK_SCORE,
        fired: Vec::new(),
        risk_factors: Vec::new(),
        opportunity_factors: Vec::new(),
    };

    for rule in RISK_RULES {
        if !(rule.applies)(signals) {
            continue;
        }
        outcome.score += rule.delta;
        outcome.fired.push(rule.name);
        let factor = (rule.describe)(signals);
        match rule.bucket {
            Bucket::Risk => outcome.risk_factors.push(factor),
            Bucket::Opportunity => outcome.opportunity_factors.push(factor),
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_signals() -> RiskSignals {
        RiskSignals {
            close: 100.0,
            rsi: Some(50.0),
            volatility: Some(0.02),
            ma5: Some(100.0),
            ma20: Some(100.0),
            volume_trend: Some(VolumeTrend::Flat),
            trend: Some(TrendDirection::Down),
            trend_strength: Some(0.3),
            position: PricePosition::Middle,
            position_level: None,
        }
    }

    #[test]
    fn quiet_market_fires_nothing() {
        let outcome = evaluate_rules(&quiet_signals());
        assert_eq!(outcome.score, BASE_RISK_SCORE);
        assert!(outcome.fired.is_empty());
    }

    #[test]
    fn overbought_adds_twenty() {
        let signals = RiskSignals {
            rsi: Some(75.0),
            ..quiet_signals()
        };
        let outcome = evaluate_rules(&signals);
        assert_eq!(outcome.score, 70);
        assert_eq!(outcome.fired, vec!["rsi_overbought"]);
        assert!(outcome.risk_factors[0].contains("75.00"));
    }

    #[test]
    fn deltas_accumulate_without_clamping() {
        let signals = RiskSignals {
            close: 90.0,
            rsi: Some(80.0),
            volatility: Some(0.05),
            ma5: Some(95.0),
            ma20: Some(99.0),
            volume_trend: Some(VolumeTrend::Expanding),
            trend: Some(TrendDirection::Down),
            trend_strength: Some(0.9),
            position: PricePosition::NearResistance,
            position_level: Some(91.0),
        };
        let outcome = evaluate_rules(&signals);
        // 50 + 20 + 15 + 15 + 15 + 20 + 10
        assert_eq!(outcome.score, 145);
        assert_eq!(outcome.risk_factors.len(), 6);
        assert!(outcome.opportunity_factors.is_empty());
    }

    #[test]
    fn opportunities_can_push_below_zero_range() {
        let signals = RiskSignals {
            close: 110.0,
            rsi: Some(20.0),
            volatility: Some(0.005),
            ma5: Some(105.0),
            ma20: Some(100.0),
            volume_trend: Some(VolumeTrend::Expanding),
            trend: Some(TrendDirection::Up),
            trend_strength: Some(0.8),
            position: PricePosition::NearSupport,
            position_level: Some(108.0),
        };
        let outcome = evaluate_rules(&signals);
        // 50 - 10 - 10 - 10; low volatility, strong uptrend and support are factor-only
        assert_eq!(outcome.score, 20);
        assert_eq!(outcome.opportunity_factors.len(), 6);
        assert!(outcome.risk_factors.is_empty());
    }

    #[test]
    fn factor_only_rules_keep_score() {
        let signals = RiskSignals {
            volatility: Some(0.001),
            trend: Some(TrendDirection::Up),
            trend_strength: Some(0.75),
            position: PricePosition::NearSupport,
            position_level: Some(99.0),
            ..quiet_signals()
        };
        let outcome = evaluate_rules(&signals);
        assert_eq!(outcome.score, BASE_RISK_SCORE);
        assert_eq!(outcome.fired, vec!["low_volatility", "strong_uptrend", "near_support"]);
    }

    #[test]
    fn missing_inputs_skip_their_rules() {
        let signals = RiskSignals {
            rsi: None,
            volatility: None,
            ma5: None,
            volume_trend: None,
            trend: None,
            trend_strength: None,
            ..quiet_signals()
        };
        assert!(evaluate_rules(&signals).fired.is_empty());
    }

    #[test]
    fn contracting_volume_pairs() {
        let rising = RiskSignals {
            volume_trend: Some(VolumeTrend::Contracting),
            trend: Some(TrendDirection::Up),
            ..quiet_signals()
        };
        assert_eq!(evaluate_rules(&rising).score, 60);
        let falling = RiskSignals {
            volume_trend: Some(VolumeTrend::Contracting),
            ..quiet_signals()
        };
        assert_eq!(evaluate_rules(&falling).score, 45);
    }

    #[test]
    fn bucket_routes_each_factor() {
        let signals = RiskSignals {
            rsi: Some(80.0),
            volatility: Some(0.001),
            volume_trend: Some(VolumeTrend::Contracting),
            trend: Some(TrendDirection::Up),
            trend_strength: Some(0.8),
            ..quiet_signals()
        };
        let outcome = evaluate_rules(&signals);
        let in_bucket = |bucket: Bucket| {
            RISK_RULES
                .iter()
                .filter(|rule| rule.bucket == bucket && outcome.fired.contains(&rule.name))
                .count()
        };
        assert_eq!(outcome.risk_factors.len(), in_bucket(Bucket::Risk));
        assert_eq!(outcome.opportunity_factors.len(), in_bucket(Bucket::Opportunity));
        assert!(!outcome.risk_factors.is_empty() && !outcome.opportunity_factors.is_empty());
    }
}
