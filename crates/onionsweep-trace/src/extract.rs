//! Wait-call extraction and call-site attribution.

use crate::parser::RawTraceEntry;
use lazy_static::lazy_static;
use onionsweep_common::{Error, Result};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

lazy_static! {
    /// Contents of the last `<...>` on a summary line (the `-T` call time).
    static ref DURATION: Regex = Regex::new(r".*<([^<>]*)>").unwrap();
    /// Contents of the outermost parentheses of a frame.
    static ref FRAME_SYMBOL: Regex = Regex::new(r"\((.*)\)").unwrap();
}

/// Which records count and how they are attributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFilter {
    /// Matched case-insensitively against the summary line.
    pub wait_marker: String,
    /// A frame is attributable when its symbol contains this.
    pub namespace: String,
}

impl Default for CallFilter {
    fn default() -> Self {
        Self {
            wait_marker: "wait".to_string(),
            namespace: "anonycast::".to_string(),
        }
    }
}

impl CallFilter {
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    fn is_wait(&self, summary: &str) -> bool {
        summary
            .to_ascii_lowercase()
            .contains(&self.wait_marker.to_ascii_lowercase())
    }
}

/// One wait, in seconds, attributed to a call site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FutexCall {
    pub duration: f64,
    pub symbol: String,
}

/// Turn raw records into attributed wait calls.
///
/// Records that are not waits are skipped. A wait without a readable
/// duration, or with an unreadable frame, is a parse error. Waits with no
/// frame in the namespace are discarded.
pub fn extract_calls<'a, I>(entries: I, filter: &CallFilter) -> Result<Vec<FutexCall>>
where
    I: IntoIterator<Item = &'a RawTraceEntry>,
{
    let mut calls = Vec::new();
    for entry in entries {
        if !filter.is_wait(&entry.summary) {
            continue;
        }
        let duration = parse_duration(entry)?;
        match attribute(entry, filter)? {
            Some(symbol) => calls.push(FutexCall { duration, symbol }),
            None => debug!(line = entry.line_number, "Wait outside namespace discarded"),
        }
    }
    Ok(calls)
}

fn parse_duration(entry: &RawTraceEntry) -> Result<f64> {
    let captured = DURATION
        .captures(&entry.summary)
        .and_then(|c| c.get(1))
        .ok_or_else(|| Error::parse(entry.line_number, &entry.summary, "missing <duration>"))?;
    captured.as_str().trim().parse::<f64>().map_err(|e| {
        Error::parse(
            entry.line_number,
            &entry.summary,
            format!("invalid duration {:?}: {}", captured.as_str(), e),
        )
    })
}

/// Symbol of the innermost frame inside the namespace.
///
/// Frames are scanned innermost first; one without a `(symbol)` before the
/// attributed frame makes the record unreadable.
fn attribute(entry: &RawTraceEntry, filter: &CallFilter) -> Result<Option<String>> {
    for frame in &entry.frames {
        let symbol = FRAME_SYMBOL
            .captures(frame)
            .and_then(|c| c.get(1))
            .ok_or_else(|| Error::parse(entry.line_number, frame, "invalid symbol"))?
            .as_str();
        if symbol.contains(&filter.namespace) {
            return Ok(Some(symbol.to_string()));
        }
    }
    Ok(None)
}
