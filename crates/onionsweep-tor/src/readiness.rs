//! Readiness gating on a daemon's output stream.

use async_trait::async_trait;
use onionsweep_common::{Error, Result};
use onionsweep_process::OutputLines;
use std::io;
use tokio::io::{AsyncBufRead, Lines};
use tracing::{debug, info};

/// Anything that yields text lines until it is exhausted.
#[async_trait]
pub trait LineSource: Send {
    /// Next line, or `None` at end of stream.
    async fn next_line(&mut self) -> io::Result<Option<String>>;
}

#[async_trait]
impl LineSource for OutputLines {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        Ok(OutputLines::next_line(self).await)
    }
}

#[async_trait]
impl<R> LineSource for Lines<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        Lines::next_line(self).await
    }
}

/// Watches a stream for a readiness marker.
///
/// The watcher has no deadline of its own; wrap [`ReadinessWatcher::watch`]
/// in a timeout.
#[derive(Debug, Clone)]
pub struct ReadinessWatcher {
    instance: String,
    marker: String,
}

impl ReadinessWatcher {
    pub fn new(instance: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            marker: marker.into(),
        }
    }

    /// Reads lines until one contains the marker and returns its 1-based
    /// line number. Nothing past that line is consumed.
    ///
    /// End of stream before the marker is [`Error::ProcessExited`].
    pub async fn watch<S>(&self, source: &mut S) -> Result<usize>
    where
        S: LineSource + ?Sized,
    {
        let mut line_number = 0;
        while let Some(line) = source.next_line().await? {
            line_number += 1;
            if line.contains(&self.marker) {
                info!(instance = %self.instance, line = line_number, "Readiness marker seen");
                return Ok(line_number);
            }
            debug!(instance = %self.instance, line = line_number, "Still bootstrapping");
        }
        Err(Error::process_exited(&self.instance, None))
    }
}
