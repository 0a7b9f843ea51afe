use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, bail};

/// Kline intervals accepted by the Binance spot API.
const VALID_INTERVALS: &[&str] = &[
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w", "1M",
];

/// Screener configuration derived from environment variables.
///
/// Every field has a default matching the original deployment, so the binary
/// runs with no environment at all.
#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    /// Exchange REST base URL.
    pub base_url: String,
    /// Kline interval, e.g. "5m".
    pub interval: String,
    /// Candles requested per symbol.
    pub candle_limit: u32,
    /// RSI lookback window.
    pub rsi_period: usize,
    /// Time between full scan cycles.
    pub scan_period: Duration,
    /// Pause between per-symbol requests inside a cycle.
    pub pause: Duration,
    /// Per-request timeout on the HTTP client.
    pub request_timeout: Duration,
    /// Extra attempts after a failed request.
    pub retries: u32,

    pub bind: String,
    pub port: u16,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.binance.com".to_string(),
            interval: "5m".to_string(),
            candle_limit: 100,
            rsi_period: 14,
            scan_period: Duration::from_secs(600),
            pause: Duration::from_millis(200),
            request_timeout: Duration::from_secs(10),
            retries: 2,
            bind: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ScreenerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env_str("SCREENER_BASE_URL", &defaults.base_url),
            interval: env_str("SCREENER_INTERVAL", &defaults.interval),
            candle_limit: env_u32("SCREENER_CANDLE_LIMIT", defaults.candle_limit),
            rsi_period: env_usize("SCREENER_RSI_PERIOD", defaults.rsi_period),
            scan_period: Duration::from_secs(env_u64("SCREENER_SCAN_PERIOD_S", 600)),
            pause: Duration::from_millis(env_u64("SCREENER_PAUSE_MS", 200)),
            request_timeout: Duration::from_secs(env_u64("SCREENER_TIMEOUT_S", 10)),
            retries: env_u32("SCREENER_RETRIES", defaults.retries),
            bind: env_str("SCREENER_BIND", &defaults.bind),
            port: env_u16("SCREENER_PORT", defaults.port),
        }
    }

    /// Reject configurations the exchange or the indicator cannot serve.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.is_empty() {
            bail!("base URL must not be empty");
        }
        if !VALID_INTERVALS.contains(&self.interval.as_str()) {
            bail!("unknown kline interval {:?}", self.interval);
        }
        if self.candle_limit == 0 || self.candle_limit > 1000 {
            bail!("candle limit must be in 1..=1000, got {}", self.candle_limit);
        }
        if self.rsi_period < 2 {
            bail!("RSI period must be at least 2, got {}", self.rsi_period);
        }
        // The ranked value comes from the next-to-last candle, so the window
        // has to close strictly inside the fetched series.
        if self.rsi_period + 2 > self.candle_limit as usize {
            bail!(
                "candle limit {} too small for RSI period {}",
                self.candle_limit,
                self.rsi_period
            );
        }
        if self.scan_period < Duration::from_secs(1) {
            bail!("scan period must be at least 1s");
        }
        if self.request_timeout < Duration::from_secs(1) {
            bail!("request timeout must be at least 1s");
        }
        if self.retries > 10 {
            bail!("retries capped at 10, got {}", self.retries);
        }
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.bind, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ScreenerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.interval, "5m");
        assert_eq!(config.candle_limit, 100);
        assert_eq!(config.rsi_period, 14);
        assert_eq!(config.scan_period, Duration::from_secs(600));
        assert_eq!(config.pause, Duration::from_millis(200));
        assert_eq!(config.listen_addr().unwrap().port(), 5000);
    }

    #[test]
    fn rejects_unknown_interval() {
        let config = ScreenerConfig {
            interval: "7m".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_window_larger_than_series() {
        let config = ScreenerConfig {
            candle_limit: 15,
            rsi_period: 14,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_bind() {
        let config = ScreenerConfig {
            bind: "not an address".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_candle_limit() {
        let config = ScreenerConfig {
            candle_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
