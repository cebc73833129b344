//! Derived analytics over a normalized price series.
//!
//! Stateless consumer of the service output: moving averages, percentage
//! changes and rolling extremes. Windows shorter than their nominal size
//! still produce a value (min-periods-1 semantics), so the head of the
//! series is not blank.

use crate::core::PricePoint;
use chrono::NaiveDate;

const MA_WINDOWS: [usize; 3] = [7, 30, 90];
const CHANGE_PERIOD: usize = 30;
const EXTREME_WINDOW: usize = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsRow {
    pub date: NaiveDate,
    pub price_brl: f64,
    pub price_usd: Option<f64>,
    pub ma_7: f64,
    pub ma_30: f64,
    pub ma_90: f64,
    /// Day-over-day change in percent; absent for the first row.
    pub pct_change: Option<f64>,
    /// Change over the trailing 30 rows in percent.
    pub pct_change_30d: Option<f64>,
    pub min_30: f64,
    pub max_30: f64,
}

fn window_mean(prices: &[f64], end: usize, window: usize) -> f64 {
    let lo = end.saturating_sub(window - 1);
    let slice = &prices[lo..=end];
    slice.iter().sum::<f64>() / slice.len() as f64
}

fn pct_change(prices: &[f64], end: usize, periods: usize) -> Option<f64> {
    let base = prices.get(end.checked_sub(periods)?)?;
    (*base != 0.0).then(|| (prices[end] / base - 1.0) * 100.0)
}

/// Full processing pipeline over an ascending series.
pub fn prepare(points: &[PricePoint]) -> Vec<AnalyticsRow> {
    let prices: Vec<f64> = points.iter().map(|p| p.price_brl).collect();

    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let lo = i.saturating_sub(EXTREME_WINDOW - 1);
            let window = &prices[lo..=i];
            let min_30 = window.iter().cloned().fold(f64::INFINITY, f64::min);
            let max_30 = window.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

            AnalyticsRow {
                date: point.date,
                price_brl: point.price_brl,
                price_usd: point.price_usd,
                ma_7: window_mean(&prices, i, MA_WINDOWS[0]),
                ma_30: window_mean(&prices, i, MA_WINDOWS[1]),
                ma_90: window_mean(&prices, i, MA_WINDOWS[2]),
                pct_change: pct_change(&prices, i, 1),
                pct_change_30d: pct_change(&prices, i, CHANGE_PERIOD),
                min_30,
                max_30,
            }
        })
        .collect()
}
