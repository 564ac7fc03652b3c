//! # onionsweep trace
//!
//! Offline analysis of futex contention traces captured with
//! `strace -e trace=futex -T --stack-trace`.
//!
//! The pipeline is strictly streaming and stateless:
//!
//! 1. [`TraceParser`] groups lines into [`RawTraceEntry`] records (a summary
//!    line plus the `>`-prefixed stack frames under it)
//! 2. [`extract_calls`] keeps wait operations and attributes each one to the
//!    innermost frame inside the traced program's namespace
//! 3. [`aggregate`] reduces the calls to per-symbol min/avg/max, ranked by
//!    average wait
//!
//! Any malformed record aborts the run; there is no partial output.

pub mod extract;
pub mod parser;
pub mod report;
pub mod stats;

// Re-export main types
pub use extract::{extract_calls, CallFilter, FutexCall};
pub use parser::{parse_trace, RawTraceEntry, TraceParser};
pub use report::{aggregate_file, aggregate_reader, TraceReport};
pub use stats::{aggregate, SymbolStats};
