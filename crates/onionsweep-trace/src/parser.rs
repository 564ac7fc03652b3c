//! Streaming record parser.

use onionsweep_common::{Error, Result};
use std::io::{BufRead, Lines};

/// Prefix marking a stack-frame line.
pub const FRAME_MARKER: char = '>';

/// One traced call: its summary line and the frames printed under it,
/// innermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTraceEntry {
    /// 1-based line number of the summary line.
    pub line_number: usize,
    pub summary: String,
    pub frames: Vec<String>,
}

/// Iterator over the records of a trace.
///
/// Lines are trimmed and blank lines are skipped. A line starting with
/// [`FRAME_MARKER`] is appended to the current record; any other line starts
/// a new one. The last record is yielded at end of input. The iterator stops
/// after the first error.
pub struct TraceParser<R> {
    lines: Lines<R>,
    line_number: usize,
    current: Option<RawTraceEntry>,
    finished: bool,
}

impl<R: BufRead> TraceParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
            current: None,
            finished: false,
        }
    }

    fn fail(&mut self, error: Error) -> Option<Result<RawTraceEntry>> {
        self.finished = true;
        self.current = None;
        Some(Err(error))
    }
}

impl<R: BufRead> Iterator for TraceParser<R> {
    type Item = Result<RawTraceEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let line = match self.lines.next() {
                None => {
                    self.finished = true;
                    return self.current.take().map(Ok);
                }
                Some(Err(e)) => return self.fail(Error::Io(e)),
                Some(Ok(line)) => line,
            };
            self.line_number += 1;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(frame) = line.strip_prefix(FRAME_MARKER) {
                match self.current.as_mut() {
                    Some(entry) => entry.frames.push(frame.trim_start().to_string()),
                    None => {
                        let error = Error::parse(self.line_number, line, "stack frame before any call");
                        return self.fail(error);
                    }
                }
                continue;
            }

            let next = RawTraceEntry {
                line_number: self.line_number,
                summary: line.to_string(),
                frames: Vec::new(),
            };
            if let Some(done) = self.current.replace(next) {
                return Some(Ok(done));
            }
        }
    }
}

/// Parse a whole trace, failing on the first malformed line.
pub fn parse_trace<R: BufRead>(reader: R) -> Result<Vec<RawTraceEntry>> {
    TraceParser::new(reader).collect()
}
