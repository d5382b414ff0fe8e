use std::future::Future;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use stock_risk_analyzer::stock_api::{
    analyze_stock, analyze_with_narrative, collect_signals, evaluate_rules, NarrativePrompt, NarrativeProvider,
    PricePoint, PricePosition, PriceSeries, RiskLevel, TrendDirection, VolumeTrend, BASE_RISK_SCORE,
    NO_SIGNAL_FACTOR, RISK_RULES,
};
use stock_risk_analyzer::{AnalysisConfig, AnalysisError};

fn build_series(rows: &[(f64, f64, f64, f64)]) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let points = rows
        .iter()
        .enumerate()
        .map(|(i, &(high, low, close, volume))| {
            PricePoint::with_derived_change(start + chrono::Duration::days(i as i64), close, high, low, close, volume)
        })
        .collect();
    PriceSeries::new(points).unwrap()
}

fn random_walk(seed: u64, n: usize) -> PriceSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = 50.0;
    let rows: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|_| {
            price *= 1.0 + rng.gen_range(-0.04..0.04);
            let high = price * (1.0 + rng.gen_range(0.0..0.02));
            let low = price * (1.0 - rng.gen_range(0.0..0.02));
            let volume = rng.gen_range(1_000.0..50_000.0);
            (high, low, price, volume)
        })
        .collect();
    build_series(&rows)
}

#[test]
fn flat_series_is_forced_low_risk() {
    let series = build_series(&[(100.0, 100.0, 100.0, 1000.0); 25]);
    let analysis = analyze_stock(&series, None, &AnalysisConfig::default()).unwrap();

    assert_eq!(analysis.indicators.volatility, 0.0);
    assert_eq!(analysis.indicators.latest_rsi(), Some(100.0));

    let volume = analysis.structure.volume_analysis.as_ref().unwrap();
    assert_eq!(volume.volume_trend, VolumeTrend::Flat);
    assert_eq!(volume.volume_ratio, 1.0);

    let trend = analysis.structure.trend_strength.as_ref().unwrap();
    assert_eq!(trend.trend, TrendDirection::Down);
    assert_eq!(trend.direction_consistency, 0.0);

    let verdict = &analysis.smart_analysis;
    assert_eq!(verdict.risk_score, 50);
    assert_eq!(verdict.risk_level, RiskLevel::Low);
    assert_eq!(verdict.risk_factors, vec![NO_SIGNAL_FACTOR.to_string()]);
    assert!(verdict.opportunity_factors.is_empty());
    assert_eq!(verdict.price_position.position, PricePosition::Middle);
    assert!(verdict.support_resistance.support.is_empty());
    assert!(verdict.market_analysis.is_none());
}

#[test]
fn steady_rally_flags_overbought_rsi() {
    let rows: Vec<(f64, f64, f64, f64)> = (0..30)
        .map(|i| {
            let close = 100.0 + i as f64 * 0.5;
            (close + 0.2, close - 0.2, close, 1000.0)
        })
        .collect();
    let series = build_series(&rows);
    let config = AnalysisConfig::default();
    let analysis = analyze_stock(&series, None, &config).unwrap();
    let verdict = &analysis.smart_analysis;

    assert!(verdict.risk_factors.iter().any(|f| f.starts_with("RSI overbought")));

    let signals = collect_signals(&series, &analysis.indicators, &analysis.structure, &config);
    let outcome = evaluate_rules(&signals);
    assert!(outcome.fired.contains(&"rsi_overbought"));
    assert_eq!(outcome.score, verdict.risk_score);
}

#[test]
fn empty_input_is_a_hard_error() {
    let parsed: Result<PriceSeries, _> = serde_json::from_str("[]");
    assert!(parsed.is_err());
    assert!(matches!(PriceSeries::new(Vec::new()), Err(AnalysisError::EmptySeries)));
}

#[test]
fn verdict_is_deterministic() {
    let series = random_walk(7, 90);
    let index = random_walk(11, 90);
    let config = AnalysisConfig::default();
    let first = serde_json::to_string(&analyze_stock(&series, Some(&index), &config).unwrap()).unwrap();
    let second = serde_json::to_string(&analyze_stock(&series, Some(&index), &config).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn absent_values_serialize_as_null() {
    let series = build_series(&[(10.0, 10.0, 10.0, 5.0); 3]);
    let analysis = analyze_stock(&series, None, &AnalysisConfig::default()).unwrap();
    let json = serde_json::to_value(&analysis).unwrap();
    assert!(json["indicators"]["rsi"][0].is_null());
    assert!(json["smart_analysis"]["trend"].is_null());
    assert!(json["smart_analysis"]["volume_analysis"].is_null());
    assert!(json["smart_analysis"]["market_analysis"].is_null());
    assert_eq!(json["smart_analysis"]["risk_level"], "low");
}

#[test]
fn random_walks_respect_invariants() {
    let config = AnalysisConfig::default();
    for seed in 0..20 {
        let series = random_walk(seed, 40 + seed as usize * 3);
        let index = random_walk(seed + 100, 70);
        let analysis = analyze_stock(&series, Some(&index), &config).unwrap();
        let price = series.latest().close;

        for ma in analysis.indicators.moving_averages.values() {
            assert_eq!(ma.len(), series.len());
        }
        for rsi in analysis.indicators.rsi.iter().flatten() {
            assert!((0.0..=100.0).contains(rsi));
        }

        let levels = &analysis.smart_analysis.support_resistance;
        assert!(levels.support.len() <= 3 && levels.resistance.len() <= 3);
        assert!(levels.support.iter().all(|&s| s < price));
        assert!(levels.resistance.iter().all(|&r| r > price));
        assert!(levels.support.windows(2).all(|w| w[1] - w[0] > price * 0.01));
        assert!(levels.resistance.windows(2).all(|w| w[1] - w[0] > price * 0.01));

        let signals = collect_signals(&series, &analysis.indicators, &analysis.structure, &config);
        let outcome = evaluate_rules(&signals);
        let expected: i32 = BASE_RISK_SCORE
            + RISK_RULES
                .iter()
                .filter(|rule| outcome.fired.contains(&rule.name))
                .map(|rule| rule.delta)
                .sum::<i32>();
        assert_eq!(analysis.smart_analysis.risk_score, expected);

        let market = analysis.smart_analysis.market_analysis.as_ref().unwrap();
        assert!(market.relative_strength > 0.0);
    }
}

struct CannedNarrator(&'static str);

impl NarrativeProvider for CannedNarrator {
    fn model(&self) -> &str {
        "canned"
    }

    fn generate(&self, prompt: &NarrativePrompt) -> impl Future<Output = anyhow::Result<String>> + Send {
        let result: anyhow::Result<String> = if self.0.is_empty() {
            Err(anyhow::anyhow!("provider unavailable"))
        } else {
            Ok(format!("{} ({} sessions)", self.0, prompt.recent.len()))
        };
        async move { result }
    }
}

#[tokio::test]
async fn narrative_comes_from_provider() {
    let series = random_walk(3, 40);
    let config = AnalysisConfig::default();
    let analysis = analyze_with_narrative(&series, None, Some(&CannedNarrator("Range-bound")), &config)
        .await
        .unwrap();
    assert_eq!(analysis.smart_analysis.llm_analysis.llm_analysis, "Range-bound (5 sessions)");
    assert_eq!(analysis.smart_analysis.llm_analysis.model, "canned");
}

#[tokio::test]
async fn failed_narrative_keeps_verdict() {
    let series = random_walk(5, 40);
    let config = AnalysisConfig::default();
    let with_failure = analyze_with_narrative(&series, None, Some(&CannedNarrator("")), &config)
        .await
        .unwrap();
    assert_eq!(with_failure.smart_analysis.llm_analysis.llm_analysis, config.narrative_fallback);

    let plain = analyze_stock(&series, None, &config).unwrap();
    assert_eq!(with_failure.smart_analysis.risk_score, plain.smart_analysis.risk_score);
    assert_eq!(with_failure.smart_analysis.risk_factors, plain.smart_analysis.risk_factors);
}
