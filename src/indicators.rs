//! Technical indicators powered by the `ta` crate

use ta::indicators::RelativeStrengthIndex;
use ta::Next;

/// Calculate RSI (Relative Strength Index) over closing prices.
///
/// The first `period` values are `None` while the averages warm up. An invalid
/// period yields all `None`.
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![None; values.len()];
    }

    let mut indicator = match RelativeStrengthIndex::new(period) {
        Ok(i) => i,
        Err(_) => return vec![None; values.len()],
    };

    values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let rsi_val = indicator.next(value);
            if i >= period {
                Some(rsi_val)
            } else {
                None
            }
        })
        .collect()
}
