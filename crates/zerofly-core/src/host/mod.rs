// ── Host command execution ──
//
// The service manager and interface tooling are external programs. They are
// reached through `HostExecutor` so the controller can be driven by a fake
// in tests and by `tokio::process` everywhere else.

mod service;

use std::fmt;
use std::io;
use std::process::Stdio;

use futures_util::future::BoxFuture;
use tracing::trace;

pub use service::{HostOutcome, ServiceController};

/// One external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl HostCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Prefix with a privilege helper such as `pkexec`.
    pub fn elevated(self, helper: Option<&str>) -> Self {
        match helper {
            Some(helper) if !helper.trim().is_empty() => {
                let mut args = Vec::with_capacity(self.args.len() + 1);
                args.push(self.program);
                args.extend(self.args);
                Self {
                    program: helper.trim().to_owned(),
                    args,
                }
            }
            _ => self,
        }
    }
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostOutput {
    /// Exit code; `None` when killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl HostOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs host programs. Implementations must not apply their own timeout;
/// the caller bounds every call.
pub trait HostExecutor: Send + Sync {
    fn run<'a>(&'a self, command: &'a HostCommand) -> BoxFuture<'a, io::Result<HostOutput>>;
}

/// `tokio::process` executor. The child is killed if the call is dropped
/// (for instance when the caller's timeout fires).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl HostExecutor for SystemExecutor {
    fn run<'a>(&'a self, command: &'a HostCommand) -> BoxFuture<'a, io::Result<HostOutput>> {
        Box::pin(async move {
            trace!(%command, "spawning host command");
            let output = tokio::process::Command::new(&command.program)
                .args(&command.args)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await?;
            Ok(HostOutput {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevated_prefixes_helper() {
        let cmd = HostCommand::new("ip", ["link", "set", "zt0", "up"]).elevated(Some("pkexec"));
        assert_eq!(cmd.program, "pkexec");
        assert_eq!(cmd.to_string(), "pkexec ip link set zt0 up");

        let plain = HostCommand::new("ip", ["link"]).elevated(None);
        assert_eq!(plain.to_string(), "ip link");
        let blank = HostCommand::new("ip", ["link"]).elevated(Some("  "));
        assert_eq!(blank.program, "ip");
    }
}
