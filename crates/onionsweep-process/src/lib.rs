//! # onionsweep process
//!
//! Low-level process operations used by the daemon and run-driver crates:
//! - launching a command locally or on a peer host through a remote shell
//! - [`ProcessHandle`], one child process with merged, line-streamed output
//! - signal-based termination and existence checks
//! - best-effort reaping of stale processes left behind by a crashed run

pub mod check;
pub mod execute;
pub mod handle;
pub mod stale;
pub mod terminate;

// Re-export main types
pub use check::process_exists;
pub use execute::{quote_shell_arg, CommandSpec, Location};
pub use handle::{OutputLines, OutputMode, ProcessHandle, StreamType};
pub use stale::{kill_stale, kill_stale_local, kill_stale_remote};
pub use terminate::terminate_gracefully;
