//! [`ProcessHandle`]: one spawned child with wait, kill and streamed output.

use crate::execute::{CommandSpec, Location};
use onionsweep_common::{Error, Result};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How the child's stdout/stderr are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Both streams are piped and merged into one [`OutputLines`] stream.
    Captured,
    /// Both streams go to the orchestrator's own stdout/stderr.
    Inherit,
}

/// Stream type (stdout or stderr)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamType::Stdout => write!(f, "stdout"),
            StreamType::Stderr => write!(f, "stderr"),
        }
    }
}

/// Merged stdout+stderr of a child, one line at a time.
///
/// The stream ends once both pipes are closed, which in practice means the
/// child exited. Dropping it does not stall the child: the forwarding tasks
/// keep draining the pipes and only stop passing lines on.
#[derive(Debug)]
pub struct OutputLines {
    rx: mpsc::UnboundedReceiver<String>,
}

impl OutputLines {
    fn forward(name: &str, child: &mut Child) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        if let Some(stdout) = child.stdout.take() {
            spawn_forwarder(name.to_string(), StreamType::Stdout, stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_forwarder(name.to_string(), StreamType::Stderr, stderr, tx);
        }

        Self { rx }
    }

    /// Next line from either stream, or `None` once both are closed.
    pub async fn next_line(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

fn spawn_forwarder<R>(name: String, stream: StreamType, reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let mut forwarding = true;
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                    debug!(process = %name, stream = %stream, "{}", line);
                    if forwarding && tx.send(line).is_err() {
                        forwarding = false;
                    }
                }
                Err(e) => {
                    warn!(process = %name, stream = %stream, error = %e, "Output stream read failed");
                    break;
                }
            }
        }
    });
}

/// A spawned external process.
///
/// The child is always spawned with `kill_on_drop`, so dropping a handle
/// without calling [`ProcessHandle::kill`] still does not leak the process.
#[derive(Debug)]
pub struct ProcessHandle {
    name: String,
    child: Child,
    pid: Option<u32>,
    output: Option<OutputLines>,
    exit_status: Option<ExitStatus>,
}

impl ProcessHandle {
    /// Spawn `spec` at `location`.
    pub fn spawn(
        name: impl Into<String>,
        spec: &CommandSpec,
        location: &Location,
        mode: OutputMode,
    ) -> Result<Self> {
        let name = name.into();
        let mut cmd = location.command(spec);
        Self::configure(&mut cmd, mode);

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::spawn(location.launcher(spec), e.to_string()))?;
        let pid = child.id();
        let output = match mode {
            OutputMode::Captured => Some(OutputLines::forward(&name, &mut child)),
            OutputMode::Inherit => None,
        };

        info!(process = %name, pid = ?pid, location = %location, "Process spawned");

        Ok(Self {
            name,
            child,
            pid,
            output,
            exit_status: None,
        })
    }

    fn configure(cmd: &mut Command, mode: OutputMode) {
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        match mode {
            OutputMode::Captured => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
            OutputMode::Inherit => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Takes the merged output stream. Only available once, and only for
    /// [`OutputMode::Captured`].
    pub fn take_output(&mut self) -> Option<OutputLines> {
        self.output.take()
    }

    /// Exit status if the process already exited, without blocking.
    pub fn try_status(&mut self) -> Result<Option<ExitStatus>> {
        if self.exit_status.is_none() {
            self.exit_status = self.child.try_wait()?;
        }
        Ok(self.exit_status)
    }

    /// Wait for the process to exit.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }
        let status = self.child.wait().await?;
        self.exit_status = Some(status);
        debug!(process = %self.name, status = %status, "Process exited");
        Ok(status)
    }

    /// Wait at most `limit` for the process to exit; `None` if it is still running.
    pub async fn wait_timeout(&mut self, limit: Duration) -> Result<Option<ExitStatus>> {
        match tokio::time::timeout(limit, self.wait()).await {
            Ok(status) => status.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Send SIGKILL and reap. A process that already exited is not an error.
    pub async fn kill(&mut self) -> Result<()> {
        if self.exit_status.is_some() {
            return Ok(());
        }
        match self.child.kill().await {
            Ok(()) => {
                self.exit_status = self.child.try_wait()?;
                debug!(process = %self.name, "Process killed");
                Ok(())
            }
            Err(e) => match self.child.try_wait() {
                Ok(Some(status)) => {
                    self.exit_status = Some(status);
                    Ok(())
                }
                _ => Err(Error::Io(e).context(format!("killing {}", self.name))),
            },
        }
    }

    /// SIGTERM, then SIGKILL if the process is still alive after `grace`.
    pub async fn terminate(&mut self, grace: Duration) -> Result<()> {
        if self.try_status()?.is_some() {
            return Ok(());
        }
        if let Some(pid) = self.pid {
            if let Err(e) = crate::terminate::terminate_gracefully(pid) {
                warn!(process = %self.name, error = %e, "SIGTERM failed, killing");
            } else if self.wait_timeout(grace).await?.is_some() {
                return Ok(());
            }
        }
        info!(process = %self.name, "Graceful termination timed out, killing");
        self.kill().await
    }
}
