//! Best-effort cleanup of processes left over from a previous run.
//!
//! A crashed attempt can leave daemons bound to the ports the next attempt
//! needs. Nothing here ever fails the caller: every problem is logged and the
//! run proceeds.

use crate::execute::{quote_shell_arg, Location};
use onionsweep_common::HostName;
use std::process::Stdio;
use sysinfo::{Pid, System};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Kill every local process whose name is exactly `process_name`.
///
/// Returns how many processes were signalled. The orchestrator itself is
/// never a candidate.
pub fn kill_stale_local(process_name: &str) -> usize {
    let mut system = System::new();
    system.refresh_processes();

    let own_pid = Pid::from_u32(std::process::id());
    let mut killed = 0;
    for process in system.processes_by_exact_name(process_name) {
        if process.pid() == own_pid {
            continue;
        }
        if process.kill() {
            debug!(pid = %process.pid(), name = process_name, "Killed stale process");
            killed += 1;
        } else {
            warn!(pid = %process.pid(), name = process_name, "Failed to kill stale process");
        }
    }

    if killed > 0 {
        info!(name = process_name, count = killed, "Killed stale local processes");
    }
    killed
}

/// Run `killall <process_name>` on `host` through the remote shell.
///
/// The exit status is ignored: `killall` reports failure when nothing matched.
pub async fn kill_stale_remote(shell: &str, host: &HostName, process_name: &str) {
    let result = Command::new(shell)
        .arg(host.as_str())
        .arg(format!("killall {}", quote_shell_arg(process_name)))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match result {
        Ok(status) => debug!(host = %host, name = process_name, status = %status, "Remote killall finished"),
        Err(e) => warn!(host = %host, name = process_name, error = %e, "Remote killall could not be launched"),
    }
}

/// Stale cleanup at an arbitrary location.
///
/// The local process table scan runs on the blocking pool.
pub async fn kill_stale(location: &Location, process_name: &str) {
    match location {
        Location::Local => {
            let name = process_name.to_string();
            if let Err(e) = tokio::task::spawn_blocking(move || kill_stale_local(&name)).await {
                warn!(name = process_name, error = %e, "Stale process scan did not finish");
            }
        }
        Location::Remote { shell, host } => kill_stale_remote(shell, host, process_name).await,
    }
}
