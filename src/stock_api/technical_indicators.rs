use std::collections::BTreeMap;

use tracing::debug;

use super::types::{ma_label, IndicatorSet, MacdSnapshot, MacdTrend, PriceSeries};
use super::utils::{calculate_returns, calculate_sample_std_dev, finite, trailing_mean};
use crate::config::AnalysisConfig;

pub struct MacdResult {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl MacdResult {
    pub fn latest(&self) -> Option<MacdSnapshot> {
        let value = *self.macd.last()?;
        let signal = *self.signal.last()?;
        let histogram = *self.histogram.last()?;
        Some(MacdSnapshot {
            value,
            signal,
            histogram,
            trend: if value > signal { MacdTrend::Bullish } else { MacdTrend::Bearish },
        })
    }
}

pub fn calculate_indicators(series: &PriceSeries, config: &AnalysisConfig) -> IndicatorSet {
    let closes = series.closes();

    let moving_averages: BTreeMap<String, Vec<Option<f64>>> = config
        .ma_windows
        .iter()
        .map(|&window| (ma_label(window), calculate_sma(&closes, window)))
        .collect();
    let rsi = calculate_rsi(&closes, config.rsi_period);
    let daily_volatility = calculate_daily_volatility(&closes);
    let volatility = daily_volatility * config.trading_days.sqrt();

    let macd_result = calculate_macd(&closes, config.macd_fast, config.macd_slow, config.macd_signal);
    // A validated series is never empty, so the MACD lines always have a last value.
    let macd = macd_result.latest().unwrap_or(MacdSnapshot {
        value: 0.0,
        signal: 0.0,
        histogram: 0.0,
        trend: MacdTrend::Bearish,
    });

    debug!(
        points = closes.len(),
        volatility,
        macd = macd.value,
        "technical indicators computed"
    );

    IndicatorSet {
        moving_averages,
        rsi,
        volatility,
        daily_volatility,
        macd,
    }
}

/// Trailing simple moving average; the first `period - 1` values average whatever is available.
pub fn calculate_sma(data: &[f64], period: usize) -> Vec<Option<f64>> {
    (0..data.len())
        .map(|i| finite(trailing_mean(data, i, period)))
        .collect()
}

/// Recursive EMA seeded with the first value: `ema = a * x + (1 - a) * ema_prev`, `a = 2 / (period + 1)`.
pub fn calculate_ema(data: &[f64], period: usize) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut result = Vec::with_capacity(data.len());

    let mut ema = data[0];
    result.push(ema);

    for &value in &data[1..] {
        ema = (value * multiplier) + (ema * (1.0 - multiplier));
        result.push(ema);
    }

    result
}

/// Mean gain and mean loss over the trailing `period` price changes ending at each index.
///
/// Index 0 has no previous close and yields `None`.
pub fn calculate_gain_loss(data: &[f64], period: usize) -> Vec<Option<(f64, f64)>> {
    let mut gains = vec![0.0; data.len()];
    let mut losses = vec![0.0; data.len()];
    for i in 1..data.len() {
        let change = data[i] - data[i - 1];
        gains[i] = if change > 0.0 { change } else { 0.0 };
        losses[i] = if change < 0.0 { -change } else { 0.0 };
    }

    (0..data.len())
        .map(|i| {
            if i == 0 {
                return None;
            }
            let start = (i + 1).saturating_sub(period.max(1)).max(1);
            let count = (i + 1 - start) as f64;
            let avg_gain = gains[start..=i].iter().sum::<f64>() / count;
            let avg_loss = losses[start..=i].iter().sum::<f64>() / count;
            Some((avg_gain, avg_loss))
        })
        .collect()
}

pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// RSI with a trailing simple-mean window. A zero mean loss reports 100.
pub fn calculate_rsi(data: &[f64], period: usize) -> Vec<Option<f64>> {
    calculate_gain_loss(data, period)
        .into_iter()
        .map(|averages| averages.and_then(|(gain, loss)| finite(rsi_from_averages(gain, loss))))
        .collect()
}

/// Latest RSI, or `None` when the last window saw no price movement at all.
pub fn latest_informative_rsi(data: &[f64], period: usize) -> Option<f64> {
    let (gain, loss) = calculate_gain_loss(data, period).last().copied().flatten()?;
    if gain == 0.0 && loss == 0.0 {
        return None;
    }
    finite(rsi_from_averages(gain, loss))
}

/// Sample standard deviation of daily returns, not annualized.
pub fn calculate_daily_volatility(closes: &[f64]) -> f64 {
    let returns = calculate_returns(closes);
    if returns.len() < 2 {
        return 0.0;
    }
    let std_dev = calculate_sample_std_dev(&returns);
    if std_dev.is_finite() {
        std_dev
    } else {
        0.0
    }
}

pub fn calculate_volatility(closes: &[f64], trading_days: f64) -> f64 {
    calculate_daily_volatility(closes) * trading_days.sqrt()
}

pub fn calculate_macd(data: &[f64], fast: usize, slow: usize, signal: usize) -> MacdResult {
    let ema_fast = calculate_ema(data, fast);
    let ema_slow = calculate_ema(data, slow);

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| f - s)
        .collect();

    let signal_line = calculate_ema(&macd_line, signal);

    let histogram: Vec<f64> = macd_line
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| m - s)
        .collect();

    MacdResult {
        macd: macd_line,
        signal: signal_line,
        histogram,
    }
}
