use std::time::{Duration, SystemTime, UNIX_EPOCH};

use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

/// One candlestick as returned by `/api/v3/klines`. The exchange encodes
/// prices as strings and timestamps as integers inside a 12-element array.
#[derive(Debug, Clone, PartialEq)]
pub struct Kline {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
}

/// Accepts floats, integers, or numeric strings. Empty strings and anything
/// else are treated as missing.
fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() { None } else { s.parse().ok() }
        }
        _ => None,
    }
}

fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_row(row: &Value) -> Option<Kline> {
    let fields = row.as_array()?;
    if fields.len() < 7 {
        return None;
    }
    Some(Kline {
        open_time: lenient_i64(&fields[0])?,
        open: lenient_f64(&fields[1])?,
        high: lenient_f64(&fields[2])?,
        low: lenient_f64(&fields[3])?,
        close: lenient_f64(&fields[4])?,
        volume: lenient_f64(&fields[5])?,
        close_time: lenient_i64(&fields[6])?,
    })
}

/// Turns a kline response body into candles, oldest first.
///
/// An error-shaped body (a JSON object such as `{"code":-1121,...}`) yields
/// an empty series. Rows that fail to parse are dropped individually.
pub fn parse_klines(body: &Value) -> Vec<Kline> {
    match body.as_array() {
        Some(rows) => rows.iter().filter_map(parse_row).collect(),
        None => Vec::new(),
    }
}

/// On a 418/429 the exchange may name the timestamp the ban lifts at
/// ("... banned until 1694020800000"). Returns how long to wait it out.
fn ban_wait(body: &str) -> Option<Duration> {
    if !body.contains("-1003") {
        return None;
    }
    let re = Regex::new(r"until\s+(\d+)").unwrap();
    let ban_until: u64 = re.captures(body)?.get(1)?.as_str().parse().ok()?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    if ban_until > now {
        // Small cushion so we do not knock again right at the boundary.
        Some(Duration::from_millis(ban_until - now) + Duration::from_secs(5))
    } else {
        None
    }
}

/// Fetches recent candles for one symbol.
///
/// Never fails: network errors, rate limits, and malformed bodies all
/// degrade to an empty series after `retries` extra attempts, so the caller
/// can skip the symbol and move on.
pub async fn fetch_klines(
    client: &Client,
    base_url: &str,
    symbol: &str,
    interval: &str,
    limit: u32,
    retries: u32,
) -> Vec<Kline> {
    let url = format!("{base_url}/api/v3/klines");
    let limit_str = limit.to_string();

    let mut backoff = Duration::from_millis(500);
    for attempt in 0..=retries {
        if attempt > 0 {
            debug!(symbol, attempt, "retrying kline fetch");
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }

        let resp = client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("interval", interval),
                ("limit", limit_str.as_str()),
            ])
            .send()
            .await;

        let response = match resp {
            Ok(r) => r,
            Err(e) => {
                debug!(symbol, error = %e, "kline request failed");
                continue;
            }
        };

        let status = response.status();
        if status == 418 || status == 429 {
            warn!(symbol, %status, "rate limited by exchange");
            if let Ok(text) = response.text().await {
                if let Some(wait) = ban_wait(&text) {
                    warn!(symbol, wait_s = wait.as_secs(), "IP ban reported, backing off");
                    tokio::time::sleep(wait).await;
                }
            }
            return Vec::new();
        }
        if !status.is_success() {
            debug!(symbol, %status, "kline request rejected");
            continue;
        }

        match response.json::<Value>().await {
            Ok(body) => return parse_klines(&body),
            Err(e) => {
                debug!(symbol, error = %e, "kline body unreadable");
                continue;
            }
        }
    }

    warn!(symbol, "kline fetch exhausted retries, skipping");
    Vec::new()
}
