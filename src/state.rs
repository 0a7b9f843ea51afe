use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::config::ScreenerConfig;

/// One ranked pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub symbol: String,
    pub rsi: f64,
}

/// The complete result of one scan cycle, sorted descending by RSI.
/// Immutable once published; the next cycle replaces it wholesale.
#[derive(Debug, Clone, Default)]
pub struct RankingSnapshot {
    pub entries: Vec<RankedEntry>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl RankingSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Shared application state, passed to route handlers via `axum::extract::State`.
///
/// The scan loop is the only writer of `snapshot`; handlers clone the inner
/// `Arc` under a short read lock, so a reader always sees one complete scan,
/// never a mix of two.
pub struct AppState {
    pub config: ScreenerConfig,
    pub client: reqwest::Client,
    snapshot: RwLock<Arc<RankingSnapshot>>,
}

impl AppState {
    pub fn new(config: ScreenerConfig) -> anyhow::Result<Arc<Self>> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(4)
            .build()?;

        Ok(Arc::new(Self {
            config,
            client,
            snapshot: RwLock::new(Arc::new(RankingSnapshot::empty())),
        }))
    }

    /// Replaces the published snapshot.
    pub async fn publish(&self, snapshot: RankingSnapshot) {
        *self.snapshot.write().await = Arc::new(snapshot);
    }

    /// Current snapshot, cheap to call from any number of readers.
    pub async fn snapshot(&self) -> Arc<RankingSnapshot> {
        Arc::clone(&*self.snapshot.read().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_empty_and_publishes_replacements() {
        let state = AppState::new(ScreenerConfig::default()).unwrap();
        assert!(state.snapshot().await.entries.is_empty());
        assert!(state.snapshot().await.last_updated.is_none());

        state
            .publish(RankingSnapshot {
                entries: vec![RankedEntry {
                    symbol: "BTCUSDT".to_string(),
                    rsi: 61.3,
                }],
                last_updated: Some(Utc::now()),
            })
            .await;

        let snap = state.snapshot().await;
        assert_eq!(snap.entries.len(), 1);
        assert_eq!(snap.entries[0].symbol, "BTCUSDT");
        assert!(snap.last_updated.is_some());
    }

    #[tokio::test]
    async fn readers_never_see_a_mixed_snapshot() {
        // Writer alternates between two complete snapshots while readers
        // sample; every observed snapshot must be wholly one or the other.
        let state = AppState::new(ScreenerConfig::default()).unwrap();

        let scan = |tag: &str, n: usize| RankingSnapshot {
            entries: (0..n)
                .map(|i| RankedEntry {
                    symbol: format!("{tag}{i}USDT"),
                    rsi: (n - i) as f64,
                })
                .collect(),
            last_updated: Some(Utc::now()),
        };

        let writer = {
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                for round in 0..200 {
                    let snap = if round % 2 == 0 {
                        scan("AAA", 3)
                    } else {
                        scan("BBB", 5)
                    };
                    state.publish(snap).await;
                    tokio::task::yield_now().await;
                }
            })
        };

        for _ in 0..200 {
            let snap = state.snapshot().await;
            if snap.entries.is_empty() {
                continue;
            }
            let tag = &snap.entries[0].symbol[..3];
            assert!(snap.entries.iter().all(|e| e.symbol.starts_with(tag)));
            let expected = if tag == "AAA" { 3 } else { 5 };
            assert_eq!(snap.entries.len(), expected);
            tokio::task::yield_now().await;
        }

        writer.await.unwrap();
    }
}
