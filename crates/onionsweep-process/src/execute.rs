//! Command construction for local and remote launches.
//!
//! A [`CommandSpec`] describes what to run; a [`Location`] decides where.
//! Remote launches go through a remote-shell program (`oarsh`, `ssh`, ...)
//! invoked as `<shell> <host> <command line>`, so the spec is flattened into
//! a single POSIX-quoted line.

use onionsweep_common::HostName;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::process::Command;

/// Executable plus fixed arguments, environment and working directory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub environment: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Returns a copy of this spec with `args` appended.
    pub fn with_args<I, S>(&self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = self.clone();
        spec.args.extend(args.into_iter().map(Into::into));
        spec
    }

    /// The whole invocation as one shell line, quoted for `sh -c`.
    pub fn shell_line(&self) -> String {
        let mut parts = Vec::new();
        if let Some(dir) = &self.working_directory {
            parts.push(format!("cd {} &&", quote_shell_arg(&dir.to_string_lossy())));
        }
        if !self.environment.is_empty() {
            parts.push("env".to_string());
            parts.extend(
                self.environment
                    .iter()
                    .map(|(key, value)| quote_shell_arg(&format!("{}={}", key, value))),
            );
        }
        parts.push(quote_shell_arg(&self.program));
        parts.extend(self.args.iter().map(|arg| quote_shell_arg(arg)));
        parts.join(" ")
    }
}

/// Where a command runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local,
    Remote { shell: String, host: HostName },
}

impl Location {
    pub fn remote(shell: impl Into<String>, host: HostName) -> Self {
        Self::Remote {
            shell: shell.into(),
            host,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }

    /// Builds the tokio command that launches `spec` at this location.
    pub fn command(&self, spec: &CommandSpec) -> Command {
        match self {
            Self::Local => {
                let mut cmd = Command::new(&spec.program);
                cmd.args(&spec.args);
                if let Some(dir) = &spec.working_directory {
                    cmd.current_dir(dir);
                }
                cmd.envs(&spec.environment);
                cmd
            }
            Self::Remote { shell, host } => {
                let mut cmd = Command::new(shell);
                cmd.arg(host.as_str()).arg(spec.shell_line());
                cmd
            }
        }
    }

    /// Program that will actually be exec'd, for error messages.
    pub fn launcher<'a>(&'a self, spec: &'a CommandSpec) -> &'a str {
        match self {
            Self::Local => &spec.program,
            Self::Remote { shell, .. } => shell,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote { host, .. } => write!(f, "{}", host),
        }
    }
}

/// Quotes one argument for a POSIX shell. Plain words pass through untouched.
pub fn quote_shell_arg(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_./:=@%+,-".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
