use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Quote asset the screener ranks. Pairs quoted in anything else are ignored.
const QUOTE_ASSET: &str = "USDT";

#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
}

/// Keeps identifiers that are actively trading and quoted in [`QUOTE_ASSET`].
pub fn filter_tradable(symbols: Vec<SymbolInfo>) -> Vec<String> {
    symbols
        .into_iter()
        .filter(|s| s.status == "TRADING" && s.symbol.ends_with(QUOTE_ASSET))
        .map(|s| s.symbol)
        .collect()
}

/// Lists every actively traded USDT pair on the exchange.
///
/// Unlike kline fetches this propagates its error after the retry budget:
/// without the symbol list there is no scan cycle to salvage.
pub async fn fetch_usdt_symbols(
    client: &Client,
    base_url: &str,
    retries: u32,
) -> anyhow::Result<Vec<String>> {
    let url = format!("{base_url}/api/v3/exchangeInfo");

    let mut backoff = Duration::from_millis(500);
    let mut last_err = None;
    for attempt in 0..=retries {
        if attempt > 0 {
            debug!(attempt, "retrying exchangeInfo fetch");
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }

        let result = async {
            let info: ExchangeInfo = client
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            Ok::<_, reqwest::Error>(info)
        }
        .await;

        match result {
            Ok(info) => return Ok(filter_tradable(info.symbols)),
            Err(e) => last_err = Some(e),
        }
    }

    Err(last_err.expect("at least one attempt ran")).context("fetching exchangeInfo")
}
