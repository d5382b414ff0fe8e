use tracing::debug;

use super::types::{PositionAnalysis, PricePosition, PriceSeries, SupportResistance};

/// Support and resistance levels drawn from every low and high in the series.
///
/// Prices are walked in ascending order. A price strictly below `current_price` becomes a new
/// support only if it is more than `spacing * current_price` away from the last accepted support;
/// resistances above the price are thinned the same way. The `max_levels` supports closest from
/// below and resistances closest from above are kept, both in ascending order.
pub fn calculate_support_resistance(
    series: &PriceSeries,
    current_price: f64,
    spacing: f64,
    max_levels: usize,
) -> SupportResistance {
    let mut prices: Vec<f64> = series
        .points()
        .iter()
        .flat_map(|d| [d.low, d.high])
        .collect();
    prices.sort_by(|a, b| a.total_cmp(b));

    let min_gap = current_price * spacing;
    let mut support_levels: Vec<f64> = Vec::new();
    let mut resistance_levels: Vec<f64> = Vec::new();

    for price in prices {
        let levels = if price < current_price {
            &mut support_levels
        } else if price > current_price {
            &mut resistance_levels
        } else {
            continue;
        };
        match levels.last() {
            Some(&last) if (price - last).abs() <= min_gap => {}
            _ => levels.push(price),
        }
    }

    let support = support_levels[support_levels.len().saturating_sub(max_levels)..].to_vec();
    resistance_levels.truncate(max_levels);

    debug!(
        supports = support.len(),
        resistances = resistance_levels.len(),
        "support/resistance levels computed"
    );

    SupportResistance {
        support,
        resistance: resistance_levels,
    }
}

/// Classifies the price against the nearest levels. Support is checked first.
pub fn analyze_price_position(price: f64, levels: &SupportResistance, tolerance: f64) -> PositionAnalysis {
    if let Some(&nearest_support) = levels.support.last() {
        if (price - nearest_support).abs() / price < tolerance {
            return PositionAnalysis {
                position: PricePosition::NearSupport,
                level: Some(nearest_support),
            };
        }
    }

    if let Some(&nearest_resistance) = levels.resistance.first() {
        if (price - nearest_resistance).abs() / price < tolerance {
            return PositionAnalysis {
                position: PricePosition::NearResistance,
                level: Some(nearest_resistance),
            };
        }
    }

    PositionAnalysis {
        position: PricePosition::Middle,
        level: None,
    }
}
