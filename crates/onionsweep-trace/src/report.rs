//! Rendering aggregated statistics.

use crate::extract::{extract_calls, CallFilter};
use crate::parser::parse_trace;
use crate::stats::{aggregate, SymbolStats};
use onionsweep_common::{Result, ResultExt};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// Ranked call-site statistics for one trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceReport {
    /// Number of wait calls that were attributed.
    pub calls: usize,
    pub symbols: Vec<SymbolStats>,
}

impl TraceReport {
    /// JSON form, durations in seconds.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Human-readable form, durations in milliseconds:
///
/// ```text
/// anonycast::deaddrop::retreive_documents+0x5a
///     min = 0.016 ms
///     avg = 16.3 ms
///     max = 24.149 ms
/// ```
impl fmt::Display for TraceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stats in &self.symbols {
            writeln!(f, "{}", stats.symbol)?;
            writeln!(f, "\tmin = {} ms", stats.min * 1000.0)?;
            writeln!(f, "\tavg = {} ms", stats.avg * 1000.0)?;
            writeln!(f, "\tmax = {} ms", stats.max * 1000.0)?;
        }
        Ok(())
    }
}

/// Parse, filter and aggregate a whole trace.
pub fn aggregate_reader<R: BufRead>(reader: R, filter: &CallFilter) -> Result<TraceReport> {
    let entries = parse_trace(reader)?;
    let calls = extract_calls(&entries, filter)?;
    let symbols = aggregate(&calls);
    info!(
        records = entries.len(),
        calls = calls.len(),
        symbols = symbols.len(),
        "Trace aggregated"
    );
    Ok(TraceReport {
        calls: calls.len(),
        symbols,
    })
}

pub fn aggregate_file(path: &Path, filter: &CallFilter) -> Result<TraceReport> {
    let file = File::open(path)
        .map_err(onionsweep_common::Error::from)
        .context(format!("opening trace {}", path.display()))?;
    aggregate_reader(BufReader::new(file), filter)
}
