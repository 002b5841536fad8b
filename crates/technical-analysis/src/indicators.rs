use valuation_core::stats::std_dev;
use valuation_core::Bar;

/// Golden-pocket retracement ratio
pub const FIB_GOLDEN_RATIO: f64 = 0.618;

/// Simple moving average, one value per full window.
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![];
    }
    data.windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}

/// Exponential Moving Average, recursive form seeded with the first value.
///
/// Output has one value per input so it lines up with the closes.
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.is_empty() {
        return vec![];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut result = Vec::with_capacity(data.len());
    result.push(data[0]);

    for i in 1..data.len() {
        let ema_val = (data[i] - result[i - 1]) * multiplier + result[i - 1];
        result.push(ema_val);
    }

    result
}

/// Relative Strength Index from simple rolling means of gains and losses.
///
/// The first value covers closes `0..=period`. A window with no losses reads 100,
/// a window with no movement at all reads 50.
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period + 1 {
        return vec![];
    }

    let mut gains = Vec::with_capacity(data.len() - 1);
    let mut losses = Vec::with_capacity(data.len() - 1);

    for i in 1..data.len() {
        let change = data[i] - data[i - 1];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let mut rsi_values = Vec::with_capacity(data.len() - period);

    for end in period..=gains.len() {
        let avg_gain = gains[end - period..end].iter().sum::<f64>() / period as f64;
        let avg_loss = losses[end - period..end].iter().sum::<f64>() / period as f64;

        let rsi = if avg_loss == 0.0 {
            if avg_gain == 0.0 {
                50.0
            } else {
                100.0
            }
        } else {
            100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
        };
        rsi_values.push(rsi);
    }

    rsi_values
}

/// MACD (Moving Average Convergence Divergence)
#[derive(Debug, Clone)]
pub struct MacdResult {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// All three series are aligned with `data`.
pub fn macd(data: &[f64], fast_period: usize, slow_period: usize, signal_period: usize) -> MacdResult {
    if fast_period == 0 || slow_period == 0 || signal_period == 0 || slow_period < fast_period {
        return MacdResult { macd_line: vec![], signal_line: vec![], histogram: vec![] };
    }

    let ema_fast = ema(data, fast_period);
    let ema_slow = ema(data, slow_period);

    let macd_line: Vec<f64> = ema_fast.iter().zip(&ema_slow).map(|(f, s)| f - s).collect();
    let signal_line = ema(&macd_line, signal_period);
    let histogram = macd_line.iter().zip(&signal_line).map(|(m, s)| m - s).collect();

    MacdResult {
        macd_line,
        signal_line,
        histogram,
    }
}

/// Bollinger Bands
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Bands at `num_std` sample standard deviations around the SMA.
pub fn bollinger_bands(data: &[f64], period: usize, num_std: f64) -> BollingerBands {
    if period < 2 || data.len() < period {
        return BollingerBands { upper: vec![], middle: vec![], lower: vec![] };
    }

    let middle = sma(data, period);
    let (upper, lower) = data
        .windows(period)
        .zip(&middle)
        .map(|(window, mid)| {
            let width = num_std * std_dev(window);
            (mid + width, mid - width)
        })
        .unzip();

    BollingerBands {
        upper,
        middle,
        lower,
    }
}

/// True range per bar. The first bar has no prior close, so its range is high - low.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let high_low = bar.high - bar.low;
            match i.checked_sub(1).map(|j| bars[j].close) {
                Some(prev_close) => high_low
                    .max((bar.high - prev_close).abs())
                    .max((bar.low - prev_close).abs()),
                None => high_low,
            }
        })
        .collect()
}

/// Average True Range as a simple rolling mean of the true range.
pub fn atr(bars: &[Bar], period: usize) -> Vec<f64> {
    sma(&true_range(bars), period)
}

/// Swing range of the recent window and its 61.8% retracement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FibonacciLevels {
    pub swing_high: f64,
    pub swing_low: f64,
    pub golden_pocket: f64,
}

/// Retracement levels over the last `lookback` bars; None with fewer than `min_bars`.
pub fn fibonacci_levels(bars: &[Bar], lookback: usize, min_bars: usize) -> Option<FibonacciLevels> {
    let recent = &bars[bars.len().saturating_sub(lookback)..];
    if recent.is_empty() || recent.len() < min_bars {
        return None;
    }

    let swing_high = recent.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let swing_low = recent.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

    Some(FibonacciLevels {
        swing_high,
        swing_low,
        golden_pocket: swing_high - (swing_high - swing_low) * FIB_GOLDEN_RATIO,
    })
}

/// Highest high of the last `lookback` bars
pub fn trailing_high(bars: &[Bar], lookback: usize) -> Option<f64> {
    bars[bars.len().saturating_sub(lookback)..]
        .iter()
        .map(|b| b.high)
        .reduce(f64::max)
}
