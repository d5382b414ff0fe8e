use tracing::{debug, warn};

use super::support_resistance::{analyze_price_position, calculate_support_resistance};
use super::types::{
    IndicatorSet, PriceSeries, StructuralSnapshot, TrendDirection, TrendStrength, VolumeAnalysis, VolumeTrend,
};
use super::utils::calculate_mean;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};

/// Ratio of the mean volume over the last `window` sessions to the `window` sessions before.
///
/// A zero prior mean reports a ratio of 1.0.
pub fn calculate_volume_ratio(volumes: &[f64], window: usize) -> Result<f64> {
    let required = window * 2;
    if volumes.len() < required {
        return Err(AnalysisError::insufficient("volume analysis", required, volumes.len()));
    }
    let n = volumes.len();
    let recent = calculate_mean(&volumes[n - window..]);
    let old = calculate_mean(&volumes[n - required..n - window]);
    Ok(if old > 0.0 { recent / old } else { 1.0 })
}

pub fn analyze_volume(series: &PriceSeries, config: &AnalysisConfig) -> Result<VolumeAnalysis> {
    let volume_ratio = calculate_volume_ratio(&series.volumes(), config.volume_window)?;

    let volume_trend = if volume_ratio > config.volume_expanding_ratio {
        VolumeTrend::Expanding
    } else if volume_ratio < config.volume_contracting_ratio {
        VolumeTrend::Contracting
    } else {
        VolumeTrend::Flat
    };

    Ok(VolumeAnalysis {
        volume_ratio,
        volume_trend,
        description: format!(
            "Average volume over the last {w} sessions is {:.2}x the prior {w}",
            volume_ratio,
            w = config.volume_window
        ),
    })
}

/// Trend strength from direction consistency and distance to a moving average.
///
/// `moving_average` is the aligned MA series to measure against; without one (or when its last
/// value is absent) the trailing `window`-close mean is used. Consistency is always divided by
/// `window`, so a series of exactly `window` points can reach at most `(window - 1) / window`.
pub fn analyze_trend_strength(
    closes: &[f64],
    moving_average: Option<&[Option<f64>]>,
    window: usize,
) -> Result<TrendStrength> {
    if closes.len() < window {
        return Err(AnalysisError::insufficient("trend strength", window, closes.len()));
    }

    let price_changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let recent_changes = &price_changes[price_changes.len().saturating_sub(window)..];
    let rising = recent_changes.iter().filter(|&&x| x > 0.0).count();
    let direction_consistency = rising as f64 / window as f64;

    let latest = closes[closes.len() - 1];
    let reference = moving_average
        .and_then(|ma| ma.last().copied().flatten())
        .unwrap_or_else(|| calculate_mean(&closes[closes.len() - window..]));
    let ma_distance = (latest - reference) / reference;

    let strength = (direction_consistency + ma_distance.abs()) / 2.0;
    let trend = if direction_consistency > 0.5 {
        TrendDirection::Up
    } else {
        TrendDirection::Down
    };

    Ok(TrendStrength {
        trend,
        strength,
        direction_consistency,
        ma_distance,
    })
}

pub fn analyze_structure(series: &PriceSeries, indicators: &IndicatorSet, config: &AnalysisConfig) -> StructuralSnapshot {
    let current_price = series.latest().close;

    let support_resistance =
        calculate_support_resistance(series, current_price, config.level_spacing, config.max_levels);
    let price_position = analyze_price_position(current_price, &support_resistance, config.near_level_tolerance);

    let volume_analysis = match analyze_volume(series, config) {
        Ok(analysis) => Some(analysis),
        Err(e) => {
            warn!("volume analysis skipped: {}", e);
            None
        }
    };

    let closes = series.closes();
    let trend_ma = indicators.moving_average(config.trend_window);
    let trend_strength = match analyze_trend_strength(&closes, trend_ma, config.trend_window) {
        Ok(strength) => Some(strength),
        Err(e) => {
            warn!("trend strength skipped: {}", e);
            None
        }
    };

    debug!(
        position = ?price_position.position,
        volume = ?volume_analysis.as_ref().map(|v| v.volume_trend),
        trend = ?trend_strength.as_ref().map(|t| t.trend),
        "structural snapshot computed"
    );

    StructuralSnapshot {
        support_resistance,
        price_position,
        volume_analysis,
        trend_strength,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::stock_api::types::PricePoint;
    use chrono::NaiveDate;

    fn series_with_volumes(volumes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let points = volumes
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                PricePoint::with_derived_change(start + chrono::Duration::days(i as i64), 10.0, 10.0, 10.0, 10.0, v)
            })
            .collect();
        PriceSeries::new(points).unwrap()
    }

    #[test]
    fn volume_regimes() {
        let config = AnalysisConfig::default();
        let expanding = series_with_volumes(&[100.0, 100.0, 100.0, 100.0, 100.0, 200.0, 200.0, 200.0, 200.0, 200.0]);
        let analysis = analyze_volume(&expanding, &config).unwrap();
        assert_eq!(analysis.volume_trend, VolumeTrend::Expanding);
        assert_relative_eq!(analysis.volume_ratio, 2.0);

        let contracting = series_with_volumes(&[100.0, 100.0, 100.0, 100.0, 100.0, 60.0, 60.0, 60.0, 60.0, 60.0]);
        assert_eq!(analyze_volume(&contracting, &config).unwrap().volume_trend, VolumeTrend::Contracting);

        let flat = series_with_volumes(&[1000.0; 10]);
        let analysis = analyze_volume(&flat, &config).unwrap();
        assert_eq!(analysis.volume_trend, VolumeTrend::Flat);
        assert_eq!(analysis.volume_ratio, 1.0);
    }

    #[test]
    fn volume_boundaries_are_exclusive() {
        let config = AnalysisConfig::default();
        let at_upper = series_with_volumes(&[100.0, 100.0, 100.0, 100.0, 100.0, 150.0, 150.0, 150.0, 150.0, 150.0]);
        assert_eq!(analyze_volume(&at_upper, &config).unwrap().volume_trend, VolumeTrend::Flat);
    }

    #[test]
    fn zero_prior_volume_uses_neutral_ratio() {
        let config = AnalysisConfig::default();
        let series = series_with_volumes(&[0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 10.0, 10.0, 10.0, 10.0]);
        assert_eq!(analyze_volume(&series, &config).unwrap().volume_ratio, 1.0);
    }

    #[test]
    fn volume_needs_two_windows() {
        let config = AnalysisConfig::default();
        let err = analyze_volume(&series_with_volumes(&[1.0; 9]), &config).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData { required: 10, actual: 9, .. }));
    }

    #[test]
    fn trend_strength_on_steady_rise() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let trend = analyze_trend_strength(&closes, None, 20).unwrap();
        assert_eq!(trend.trend, TrendDirection::Up);
        assert_eq!(trend.direction_consistency, 1.0);
        // mean of 110..=129 is 119.5
        assert_relative_eq!(trend.ma_distance, (129.0 - 119.5) / 119.5, epsilon = 1e-12);
        assert_relative_eq!(trend.strength, (1.0 + trend.ma_distance) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn half_consistency_is_down() {
        let closes: Vec<f64> = (0..21).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        let trend = analyze_trend_strength(&closes, None, 20).unwrap();
        assert_eq!(trend.direction_consistency, 0.5);
        assert_eq!(trend.trend, TrendDirection::Down);
    }

    #[test]
    fn trend_strength_uses_supplied_average() {
        let closes = vec![10.0; 20];
        let mut ma = vec![Some(10.0); 20];
        ma[19] = Some(8.0);
        let trend = analyze_trend_strength(&closes, Some(&ma), 20).unwrap();
        assert_relative_eq!(trend.ma_distance, 0.25);
        assert_relative_eq!(trend.strength, 0.125);
    }

    #[test]
    fn strength_is_not_clamped() {
        let mut closes: Vec<f64> = (0..20).map(|i| 10.0 + i as f64 * 0.01).collect();
        closes.push(40.0);
        let trend = analyze_trend_strength(&closes, None, 20).unwrap();
        assert!(trend.strength > 1.0);
    }

    #[test]
    fn trend_strength_needs_window() {
        assert!(analyze_trend_strength(&[1.0; 19], None, 20).is_err());
    }
}
