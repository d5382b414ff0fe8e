use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::structure::{analyze_trend_strength, calculate_volume_ratio};
use super::types::{
    MarketAnalysis, MarketContext, MarketSentiment, PeriodTrend, PriceSeries, SentimentMetrics, SentimentState,
    TrendDirection,
};
use super::utils::{calculate_returns, calculate_variance, period_change, round_to};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};

const QUARTER_SESSIONS: usize = 60;

pub fn period_name(days: usize) -> String {
    match days {
        1 => "daily".to_string(),
        5 => "weekly".to_string(),
        20 => "monthly".to_string(),
        60 => "quarterly".to_string(),
        n => format!("{}d", n),
    }
}

/// Percent change over each period that fits in the series; longer periods are skipped.
pub fn calculate_period_trends(closes: &[f64], periods: &[usize]) -> Vec<PeriodTrend> {
    periods
        .iter()
        .filter_map(|&days| {
            let change = period_change(closes, days)?;
            Some(PeriodTrend {
                name: period_name(days),
                days,
                change: round_to(change, 2),
                trend: if change > 0.0 { TrendDirection::Up } else { TrendDirection::Down },
            })
        })
        .collect()
}

pub fn analyze_market_sentiment(index: &PriceSeries, config: &AnalysisConfig) -> Result<MarketSentiment> {
    let window = config.trend_window;
    if index.len() < window {
        return Err(AnalysisError::insufficient("market sentiment", window, index.len()));
    }

    let closes = index.closes();
    let n = closes.len();
    // Compares each of the last `window - 1` closes with the one before it.
    let up_days = (1..window.min(n))
        .filter(|&i| closes[n - i] > closes[n - i - 1])
        .count();

    let volume_ratio = calculate_volume_ratio(&index.volumes(), config.volume_window).unwrap_or(1.0);
    let volatility = calculate_variance(&calculate_returns(&closes)).sqrt() * config.trading_days.sqrt();

    let mut score = 0;
    let mut factors = Vec::new();

    if up_days >= 15 {
        score += 30;
        factors.push("Market has been rising steadily, sentiment is optimistic".to_string());
    } else if up_days <= 5 {
        score -= 30;
        factors.push("Market has been falling steadily, sentiment is pessimistic".to_string());
    }

    if volume_ratio > config.volume_expanding_ratio {
        score += 20;
        factors.push("Volume is expanding markedly, market activity is picking up".to_string());
    } else if volume_ratio < config.volume_contracting_ratio {
        score -= 20;
        factors.push("Volume is shrinking markedly, market activity is fading".to_string());
    }

    if volatility > 0.3 {
        score -= 10;
        factors.push("Market is swinging sharply, risk appetite is lower".to_string());
    } else if volatility < 0.1 {
        score += 10;
        factors.push("Market is calm, risk appetite is moderate".to_string());
    }

    let state = if score >= 30 {
        SentimentState::Bullish
    } else if score <= -30 {
        SentimentState::Bearish
    } else {
        SentimentState::Neutral
    };

    Ok(MarketSentiment {
        score,
        state,
        factors,
        metrics: SentimentMetrics {
            up_days_ratio: round_to(up_days as f64 / window as f64 * 100.0, 2),
            volume_ratio: round_to(volume_ratio, 2),
            volatility: round_to(volatility * 100.0, 2),
        },
    })
}

pub fn analyze_market_trend(index: &PriceSeries, config: &AnalysisConfig) -> Result<MarketContext> {
    if index.len() < QUARTER_SESSIONS {
        warn!(points = index.len(), "benchmark series is shorter than a quarter");
    }

    let closes = index.closes();
    let strength = analyze_trend_strength(&closes, None, config.trend_window)?;
    let sentiment = analyze_market_sentiment(index, config)?;

    let trends: BTreeMap<String, PeriodTrend> = calculate_period_trends(&closes, &config.market_trend_periods)
        .into_iter()
        .map(|t| (t.name.clone(), t))
        .collect();

    debug!(score = sentiment.score, state = ?sentiment.state, "market context computed");

    Ok(MarketContext {
        trends,
        strength,
        sentiment,
    })
}

/// Relative strength of the security against the index over `window` sessions.
pub fn relative_strength_checked(stock: &[f64], index: &[f64], window: usize) -> Result<f64> {
    let stock_return = period_change(stock, window)
        .ok_or_else(|| AnalysisError::insufficient("relative strength", window, stock.len()))?
        / 100.0;
    let index_return = period_change(index, window)
        .ok_or_else(|| AnalysisError::insufficient("relative strength", window, index.len()))?
        / 100.0;

    let relative = (1.0 + stock_return) / (1.0 + index_return);
    if relative.is_finite() {
        Ok(relative)
    } else {
        Ok(1.0)
    }
}

/// Same as [`relative_strength_checked`], falling back to a neutral 1.0.
pub fn calculate_relative_strength(stock: &[f64], index: &[f64], window: usize) -> f64 {
    relative_strength_checked(stock, index, window).unwrap_or(1.0)
}

pub fn compare_with_market(stock: &PriceSeries, index: &PriceSeries, config: &AnalysisConfig) -> Result<MarketAnalysis> {
    let market = analyze_market_trend(index, config)?;
    let relative_strength =
        calculate_relative_strength(&stock.closes(), &index.closes(), config.relative_strength_window);

    let mut conclusions = Vec::new();

    if let Some(weekly) = market.trends.get(&period_name(5)) {
        let direction = match weekly.trend {
            TrendDirection::Up => "rising",
            TrendDirection::Down => "falling",
        };
        conclusions.push(format!("With the market {} this week,", direction));
        if relative_strength > 1.1 {
            conclusions.push("the stock is outperforming the market and may be moving independently".to_string());
        } else if relative_strength < 0.9 {
            conclusions.push("the stock is lagging the market, watch for fundamental changes".to_string());
        } else {
            conclusions.push("the stock is moving in step with the market".to_string());
        }
    }

    match market.sentiment.state {
        SentimentState::Bullish => {
            conclusions.push("Market sentiment is optimistic, exposure can be raised moderately".to_string())
        }
        SentimentState::Bearish => {
            conclusions.push("Market sentiment is pessimistic, consider reducing exposure".to_string())
        }
        SentimentState::Neutral => {}
    }

    Ok(MarketAnalysis {
        market_analysis: market,
        relative_strength: round_to(relative_strength, 2),
        conclusions,
    })
}
