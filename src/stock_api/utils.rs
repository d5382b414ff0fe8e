pub fn calculate_mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population variance (divides by n).
pub fn calculate_variance(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mean = calculate_mean(data);
    data.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / data.len() as f64
}

/// Sample standard deviation (divides by n - 1). Zero for fewer than two values.
pub fn calculate_sample_std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let mean = calculate_mean(data);
    let variance = data.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    variance.sqrt()
}

/// Day-over-day fractional returns; one element shorter than the input.
pub fn calculate_returns(closes: &[f64]) -> Vec<f64> {
    closes.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect()
}

/// Mean of the trailing `window` values ending at `index`, using fewer at the series start.
pub fn trailing_mean(data: &[f64], index: usize, window: usize) -> f64 {
    let start = (index + 1).saturating_sub(window.max(1));
    calculate_mean(&data[start..=index])
}

/// Percent change of the latest close against the `days`-th close from the end.
///
/// The window includes the latest session, so `days = 1` compares the latest close with
/// itself and a series of exactly `days` points is enough.
pub fn period_change(closes: &[f64], days: usize) -> Option<f64> {
    if days == 0 || closes.len() < days {
        return None;
    }
    let latest = closes[closes.len() - 1];
    let reference = closes[closes.len() - days];
    Some((latest - reference) / reference * 100.0)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn finite(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/// Percentile with linear interpolation between closest ranks. `q` is in [0, 100].
pub fn percentile(data: &[f64], q: f64) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

pub struct RegressionFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_value: f64,
}

/// Least-squares fit of `values` against their index. `r_value` is 0 when either side has no variance.
pub fn linear_regression(values: &[f64]) -> Option<RegressionFit> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = calculate_mean(values);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = y - y_mean;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let r_value = if syy == 0.0 { 0.0 } else { sxy / (sxx * syy).sqrt() };

    Some(RegressionFit {
        slope,
        intercept,
        r_value,
    })
}
