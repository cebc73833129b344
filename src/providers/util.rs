use crate::core::SourceRow;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retries an async HTTP operation with a fixed backoff.
///
/// Only transport-level failures (`reqwest::Error`) are retried; an HTTP
/// error status is a well-formed response and comes back as `Ok`.
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `backoff`: Delay between attempts
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    backoff: Duration,
) -> Result<T, reqwest::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries {
                    return Err(err);
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, retries, err
                );
                attempt += 1;
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

/// Parses a Brazilian-formatted decimal: thousands separated by `.`,
/// decimal comma, optionally prefixed with a currency symbol.
/// `"R$ 1.234,56"` parses to `1234.56`.
pub fn parse_br_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let normalized = cleaned.replace('.', "").replace(',', ".");
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a DD/MM/YYYY date, the convention used by CEPEA pages and the
/// SGS API alike.
pub fn parse_br_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d/%m/%Y").ok()
}

/// Common post-parse contract for every source: drop rows outside
/// [start, end], sort ascending by date, keep the last-seen row for
/// duplicate dates.
pub fn normalize_rows(rows: Vec<SourceRow>, start: NaiveDate, end: NaiveDate) -> Vec<SourceRow> {
    let mut by_date: BTreeMap<NaiveDate, SourceRow> = BTreeMap::new();
    for row in rows {
        if row.date < start || row.date > end {
            continue;
        }
        // Later insertions win for equal dates
        by_date.insert(row.date, row);
    }
    by_date.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(d: NaiveDate, price: f64) -> SourceRow {
        SourceRow {
            date: d,
            price,
            price_secondary: None,
        }
    }

    #[test]
    fn test_parse_br_number() {
        assert_eq!(parse_br_number("1.234,56"), Some(1234.56));
        assert_eq!(parse_br_number("R$ 245,30"), Some(245.30));
        assert_eq!(parse_br_number(" 1.234.567,89 "), Some(1234567.89));
        assert_eq!(parse_br_number("-12,5"), Some(-12.5));
        assert_eq!(parse_br_number("1.234"), Some(1234.0));
        assert_eq!(parse_br_number("n/d"), None);
        assert_eq!(parse_br_number(""), None);
        assert_eq!(parse_br_number("--"), None);
    }

    #[test]
    fn test_parse_br_date() {
        assert_eq!(parse_br_date("02/01/2024"), Some(date(2024, 1, 2)));
        assert_eq!(parse_br_date(" 31/12/2023 "), Some(date(2023, 12, 31)));
        assert_eq!(parse_br_date("2024-01-02"), None);
        assert_eq!(parse_br_date("32/01/2024"), None);
    }

    #[test]
    fn test_normalize_rows_filters_sorts_and_dedups() {
        let rows = vec![
            row(date(2024, 1, 4), 103.0),
            row(date(2024, 1, 2), 101.0),
            row(date(2023, 12, 30), 99.0), // before range
            row(date(2024, 1, 2), 101.5),  // duplicate date, last-seen wins
            row(date(2024, 2, 1), 110.0),  // after range
        ];

        let normalized = normalize_rows(rows, date(2024, 1, 1), date(2024, 1, 31));
        assert_eq!(
            normalized,
            vec![row(date(2024, 1, 2), 101.5), row(date(2024, 1, 4), 103.0)]
        );
    }

    #[tokio::test]
    async fn test_with_retry_exhausts_attempts() {
        let attempts = AtomicUsize::new(0);

        // Port 9 (discard) has no listener, so every attempt is a
        // transport error
        let result = with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { reqwest::get("http://127.0.0.1:9/").await }
            },
            2,
            Duration::from_millis(1),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_returns_first_success() {
        let attempts = AtomicUsize::new(0);

        let result = with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, reqwest::Error>(42) }
            },
            3,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
