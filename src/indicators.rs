use ta::Next;
use ta::indicators::RelativeStrengthIndex;

/// RSI over a closing-price series, one output per input row.
///
/// The indicator needs `period` price changes before it says anything, so
/// the first `period` rows are `None`. An empty input yields an empty output.
pub fn rsi_series(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut rsi = match RelativeStrengthIndex::new(period) {
        Ok(rsi) => rsi,
        Err(_) => return vec![None; closes.len()],
    };

    closes
        .iter()
        .enumerate()
        .map(|(i, &price)| {
            let value = rsi.next(price);
            if i < period { None } else { Some(value) }
        })
        .collect()
}
