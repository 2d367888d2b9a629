use async_trait::async_trait;

use crate::models::{Bar, BarPeriod, MarketSnapshot, Quote};

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn get_quote(&self, code: &str) -> Result<Quote, String>;
}

/// Completed bars, ordered oldest to newest.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    async fn get_bars(&self, code: &str, count: usize, period: BarPeriod) -> Result<Vec<Bar>, String>;
}

/// Mean of the last `n` closes, or 0 when fewer than `n` bars exist.
pub fn moving_average(bars: &[Bar], n: usize) -> f64 {
    if n == 0 || bars.len() < n {
        return 0.0;
    }
    let sum: f64 = bars[bars.len() - n..].iter().map(|b| b.close).sum();
    sum / n as f64
}

pub fn build_snapshot(code: &str, quote: &Quote, bars: &[Bar], fetched_at: i64) -> MarketSnapshot {
    let historical_high = bars.iter().map(|b| b.high).fold(0.0_f64, f64::max);
    let historical_low = bars
        .iter()
        .map(|b| b.low)
        .filter(|l| *l > 0.0)
        .fold(None, |acc: Option<f64>, l| Some(acc.map_or(l, |a| a.min(l))))
        .unwrap_or(0.0);

    MarketSnapshot {
        code: code.to_string(),
        close_price: quote.price,
        open_price: quote.open,
        high_price: quote.high,
        low_price: quote.low,
        pre_close_price: quote.pre_close,
        change_percent: quote.change_percent,
        volume: quote.volume,
        volume_ratio: quote.volume_ratio,
        ma5: moving_average(bars, 5),
        ma10: moving_average(bars, 10),
        ma20: moving_average(bars, 20),
        historical_high,
        historical_low,
        fetched_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| Bar {
                time: i as i64,
                open: *c,
                close: *c,
                high: c + 1.0,
                low: c - 1.0,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn moving_average_uses_latest_bars() {
        let b = bars(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(moving_average(&b, 5), 4.0);
        assert_eq!(moving_average(&b, 10), 0.0);
    }

    #[test]
    fn snapshot_without_history_degrades_to_zero() {
        let quote = Quote {
            price: 10.0,
            high: 10.5,
            change_percent: 1.2,
            ..Default::default()
        };
        let snap = build_snapshot("000001", &quote, &[], 42);

        assert_eq!(snap.close_price, 10.0);
        assert_eq!(snap.ma5, 0.0);
        assert_eq!(snap.historical_high, 0.0);
        assert_eq!(snap.historical_low, 0.0);
        assert_eq!(snap.fetched_at, 42);
    }

    #[test]
    fn snapshot_tracks_window_extremes() {
        let b = bars(&[10.0, 14.0, 8.0, 12.0]);
        let snap = build_snapshot("000001", &Quote::default(), &b, 0);

        assert_eq!(snap.historical_high, 15.0);
        assert_eq!(snap.historical_low, 7.0);
    }
}
