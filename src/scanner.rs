//! The scan cycle: list symbols, fetch candles, rank by RSI, publish.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info};

use crate::indicators::rsi_series;
use crate::klines::{self, Kline};
use crate::state::{AppState, RankedEntry, RankingSnapshot};
use crate::symbols;

/// RSI of the next-to-last candle in the series.
///
/// The last candle is still forming, so ranking on it would compare closed
/// candles against a partial one; the next-to-last row is the freshest value
/// that is actually final. `None` when the series is too short for the
/// window to close there, or when the indicator is not finite.
pub fn closed_candle_rsi(klines: &[Kline], period: usize) -> Option<f64> {
    if klines.len() < 2 {
        return None;
    }
    let closes: Vec<f64> = klines.iter().map(|k| k.close).collect();
    let series = rsi_series(&closes, period);
    let value = series[series.len() - 2]?;
    value.is_finite().then_some(value)
}

fn evaluate_symbol(symbol: &str, klines: &[Kline], period: usize) -> Option<RankedEntry> {
    if klines.is_empty() {
        debug!(symbol, "empty candle series, skipped");
        return None;
    }
    match closed_candle_rsi(klines, period) {
        Some(rsi) => Some(RankedEntry {
            symbol: symbol.to_string(),
            rsi,
        }),
        None => {
            debug!(symbol, "RSI undefined for closed candle, skipped");
            None
        }
    }
}

/// Orders the accumulated entries descending by RSI and stamps the result.
pub fn build_snapshot(mut entries: Vec<RankedEntry>) -> RankingSnapshot {
    entries.sort_unstable_by(|a, b| {
        b.rsi
            .partial_cmp(&a.rsi)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    RankingSnapshot {
        entries,
        last_updated: Some(Utc::now()),
    }
}

/// One full pass over every tradable pair.
///
/// A failing symbol is skipped and the cycle continues; a failing symbol
/// *listing* aborts the whole cycle and leaves the previous snapshot up.
pub async fn scan_once(state: &AppState) -> anyhow::Result<usize> {
    let cfg = &state.config;
    let symbols = symbols::fetch_usdt_symbols(&state.client, &cfg.base_url, cfg.retries).await?;
    info!(symbols = symbols.len(), "scan cycle started");

    let mut entries = Vec::with_capacity(symbols.len());
    for symbol in &symbols {
        let klines = klines::fetch_klines(
            &state.client,
            &cfg.base_url,
            symbol,
            &cfg.interval,
            cfg.candle_limit,
            cfg.retries,
        )
        .await;

        if let Some(entry) = evaluate_symbol(symbol, &klines, cfg.rsi_period) {
            entries.push(entry);
        }

        // Spread requests out so a full scan stays inside the exchange's
        // request-weight budget.
        tokio::time::sleep(cfg.pause).await;
    }

    let ranked = entries.len();
    state.publish(build_snapshot(entries)).await;
    Ok(ranked)
}

/// Scan, sleep, repeat until the process dies.
pub async fn run_scan_loop(state: Arc<AppState>) {
    loop {
        let started = Instant::now();
        match scan_once(&state).await {
            Ok(ranked) => info!(
                ranked,
                elapsed_s = started.elapsed().as_secs(),
                "scan cycle complete"
            ),
            Err(e) => error!(error = ?e, "scan cycle aborted, keeping previous snapshot"),
        }
        tokio::time::sleep(state.config.scan_period).await;
    }
}
