//! Process existence checking.

use onionsweep_common::{Error, Result};

/// Check if a process with the given PID exists.
///
/// Uses `kill(pid, 0)`, which sends no signal. A zombie that has not been
/// reaped yet still counts as existing.
pub fn process_exists(pid: u32) -> Result<bool> {
    #[cfg(unix)]
    {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        match kill(Pid::from_raw(pid as i32), None) {
            Ok(_) => Ok(true),
            Err(nix::errno::Errno::ESRCH) => Ok(false),
            // Exists, but owned by someone else
            Err(nix::errno::Errno::EPERM) => Ok(true),
            Err(e) => Err(Error::Io(std::io::Error::from_raw_os_error(e as i32))
                .context(format!("checking process {}", pid))),
        }
    }

    #[cfg(not(unix))]
    {
        Err(Error::config(format!(
            "process existence check for {} is only supported on unix",
            pid
        )))
    }
}
