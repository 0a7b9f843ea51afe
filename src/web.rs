use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;

use crate::state::{AppState, RankingSnapshot};

/// Assemble the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .with_state(state)
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_index(&*state.snapshot().await))
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// The ranked table as a full HTML page. An empty snapshot renders the
/// header row alone, which is what a visitor sees before the first scan
/// finishes.
pub fn render_index(snapshot: &RankingSnapshot) -> String {
    let updated = match snapshot.last_updated {
        Some(ts) => format!("Data taken at {} UTC", ts.format("%d-%m-%Y %H:%M:%S")),
        None => "First scan in progress".to_string(),
    };

    let mut rows = String::new();
    for entry in &snapshot.entries {
        rows.push_str(&format!(
            "        <tr><td>{}</td><td>{:.2}</td></tr>\n",
            escape_html(&entry.symbol),
            entry.rsi
        ));
    }

    format!(
        r##"<!DOCTYPE html>
<html lang="zh-Hant">
<head>
    <meta charset="UTF-8">
    <title>USDT RSI Screener</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 24px; }}
        p {{ color: #666; }}
        table {{ border-collapse: collapse; }}
        th, td {{ border: 1px solid #999; padding: 4px 12px; text-align: left; }}
        th {{ background: #f0f0f0; }}
    </style>
</head>
<body>
    <p>{updated}</p>
    <table>
        <tr>
            <th>交易對</th>
            <th>RSI</th>
        </tr>
{rows}    </table>
</body>
</html>
"##
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RankedEntry;
    use chrono::Utc;

    #[test]
    fn empty_snapshot_renders_header_only() {
        let page = render_index(&RankingSnapshot::empty());
        assert!(page.contains("<th>交易對</th>"));
        assert!(page.contains("<th>RSI</th>"));
        assert!(!page.contains("<td>"));
        assert!(page.contains("First scan in progress"));
    }

    #[test]
    fn rows_appear_in_snapshot_order() {
        let snapshot = RankingSnapshot {
            entries: vec![
                RankedEntry { symbol: "BTCUSDT".into(), rsi: 71.236 },
                RankedEntry { symbol: "ETHUSDT".into(), rsi: 55.0 },
            ],
            last_updated: Some(Utc::now()),
        };
        let page = render_index(&snapshot);
        assert!(page.contains("<td>BTCUSDT</td><td>71.24</td>"));
        assert!(page.contains("<td>ETHUSDT</td><td>55.00</td>"));
        let btc = page.find("BTCUSDT").unwrap();
        let eth = page.find("ETHUSDT").unwrap();
        assert!(btc < eth);
        assert!(page.contains("Data taken at"));
    }

    #[test]
    fn symbols_are_escaped() {
        let snapshot = RankingSnapshot {
            entries: vec![RankedEntry {
                symbol: "<script>USDT".into(),
                rsi: 50.0,
            }],
            last_updated: Some(Utc::now()),
        };
        let page = render_index(&snapshot);
        assert!(page.contains("&lt;script&gt;USDT"));
        assert!(!page.contains("<script>"));
    }
}
