//! Per-symbol reduction of wait calls.

use crate::extract::FutexCall;
use serde::Serialize;
use std::collections::BTreeMap;

/// Wait statistics for one call site, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolStats {
    pub symbol: String,
    pub count: usize,
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

/// Group calls by symbol and rank them by ascending average wait.
/// Equal averages are ordered by symbol.
pub fn aggregate<'a, I>(calls: I) -> Vec<SymbolStats>
where
    I: IntoIterator<Item = &'a FutexCall>,
{
    let mut groups: BTreeMap<&str, (usize, f64, f64, f64)> = BTreeMap::new();
    for call in calls {
        let group = groups
            .entry(call.symbol.as_str())
            .or_insert((0, f64::INFINITY, 0.0, f64::NEG_INFINITY));
        group.0 += 1;
        group.1 = group.1.min(call.duration);
        group.2 += call.duration;
        group.3 = group.3.max(call.duration);
    }

    let mut stats: Vec<SymbolStats> = groups
        .into_iter()
        .map(|(symbol, (count, min, sum, max))| SymbolStats {
            symbol: symbol.to_string(),
            count,
            min,
            avg: sum / count as f64,
            max,
        })
        .collect();
    // Stable sort keeps the BTreeMap's symbol order for ties.
    stats.sort_by(|a, b| a.avg.total_cmp(&b.avg));
    stats
}
