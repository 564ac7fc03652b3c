//! Signal-based process termination.

use onionsweep_common::{Error, Result};

/// Ask a process to stop (SIGTERM).
pub fn terminate_gracefully(pid: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(|e| {
            Error::Io(std::io::Error::from_raw_os_error(e as i32))
                .context(format!("sending SIGTERM to {}", pid))
        })
    }

    #[cfg(not(unix))]
    {
        Err(Error::config(format!(
            "graceful termination of {} is only supported on unix",
            pid
        )))
    }
}
