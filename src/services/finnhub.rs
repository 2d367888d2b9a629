use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::models::{Bar, BarPeriod, Quote};

use super::market_data::{HistoryProvider, QuoteProvider};

const BASE_URL: &str = "https://finnhub.io/api/v1";

#[derive(Clone)]
pub struct FinnhubClient {
    http: Client,
    api_key: String,
}

impl FinnhubClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: Client::new(),
            api_key,
        }
    }

    fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub async fn quote(&self, symbol: &str) -> Result<QuoteResponse, String> {
        if !self.has_key() {
            return Err("FINNHUB_API_KEY is missing in .env".to_string());
        }

        let url = format!("{BASE_URL}/quote");
        let res = self
            .http
            .get(url)
            .query(&[("symbol", symbol), ("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("Finnhub quote failed: {status} {body}"));
        }

        res.json::<QuoteResponse>().await.map_err(|e| e.to_string())
    }

    pub async fn candles(
        &self,
        symbol: &str,
        resolution: &str,
        from: i64,
        to: i64,
    ) -> Result<CandleResponse, String> {
        if !self.has_key() {
            return Err("FINNHUB_API_KEY is missing in .env".to_string());
        }

        let url = format!("{BASE_URL}/stock/candle");
        let from = from.to_string();
        let to = to.to_string();
        let res = self
            .http
            .get(url)
            .query(&[
                ("symbol", symbol),
                ("resolution", resolution),
                ("from", from.as_str()),
                ("to", to.as_str()),
                ("token", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("Finnhub candles failed: {status} {body}"));
        }

        res.json::<CandleResponse>().await.map_err(|e| e.to_string())
    }
}

fn resolution(period: BarPeriod) -> (&'static str, i64) {
    // (finnhub resolution, seconds per bar)
    match period {
        BarPeriod::Daily => ("D", 86_400),
        BarPeriod::Weekly => ("W", 7 * 86_400),
        BarPeriod::Monthly => ("M", 31 * 86_400),
    }
}

#[async_trait]
impl QuoteProvider for FinnhubClient {
    async fn get_quote(&self, code: &str) -> Result<Quote, String> {
        let q = self.quote(code).await?;

        if !q.c.is_finite() || q.c <= 0.0 {
            return Err(format!("no quote for {code}"));
        }

        Ok(Quote {
            price: q.c,
            open: q.o,
            high: q.h,
            low: q.l,
            pre_close: q.pc,
            change_percent: q.dp.unwrap_or(0.0),
            volume: 0.0,
            volume_ratio: 0.0,
        })
    }
}

#[async_trait]
impl HistoryProvider for FinnhubClient {
    async fn get_bars(&self, code: &str, count: usize, period: BarPeriod) -> Result<Vec<Bar>, String> {
        let (res, step) = resolution(period);

        // completed bars only: stop at the start of the current UTC day
        let now = Utc::now().timestamp();
        let to = now - now.rem_euclid(86_400) - 1;
        // weekends and holidays: ask for twice the span and trim
        let from = to - step * (count as i64) * 2;

        let candles = self.candles(code, res, from, to).await?;
        if candles.s != "ok" {
            return Err(format!("no candles for {code}: {}", candles.s));
        }

        let mut bars = candles.into_bars();
        if bars.len() > count {
            bars.drain(..bars.len() - count);
        }
        Ok(bars)
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct QuoteResponse {
    // current
    pub c: f64,
    // change
    pub d: Option<f64>,
    // percent change
    pub dp: Option<f64>,
    // high
    pub h: f64,
    // low
    pub l: f64,
    // open
    pub o: f64,
    // previous close
    pub pc: f64,
    // timestamp
    pub t: i64,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CandleResponse {
    #[serde(default)]
    pub c: Vec<f64>,
    #[serde(default)]
    pub h: Vec<f64>,
    #[serde(default)]
    pub l: Vec<f64>,
    #[serde(default)]
    pub o: Vec<f64>,
    #[serde(default)]
    pub t: Vec<i64>,
    #[serde(default)]
    pub v: Vec<f64>,
    // "ok" | "no_data"
    pub s: String,
}

impl CandleResponse {
    pub fn into_bars(self) -> Vec<Bar> {
        let n = [self.c.len(), self.h.len(), self.l.len(), self.t.len()]
            .into_iter()
            .min()
            .unwrap_or(0);

        (0..n)
            .map(|i| Bar {
                time: self.t[i],
                open: self.o.get(i).copied().unwrap_or(self.c[i]),
                close: self.c[i],
                high: self.h[i],
                low: self.l[i],
                volume: self.v.get(i).copied().unwrap_or(0.0),
            })
            .collect()
    }
}
