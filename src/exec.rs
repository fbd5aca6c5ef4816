//! External command execution.
//!
//! Two policies live here. Mutating package manager commands run through
//! [`run_checked`]: output streams to the terminal, stderr is captured so a
//! failure can carry it, and a non-zero exit is an error. Read-only queries
//! run through [`capture`]: stdout and stderr are collected and the call
//! never fails, because an empty result is a valid answer.

use std::fmt;
use std::io::{self, Write};

use duct::cmd;

use crate::error::{Error, Result};

/// A fully-constructed external command.
///
/// Kept separate from execution so command construction stays pure and
/// testable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<P, I, A>(program: P, args: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        write!(f, "{}", shell_words::join(words))
    }
}

/// Best-effort result of a read-only query.
#[derive(Debug, Clone, Default)]
pub struct Capture {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, or `None` when the process could not be spawned or was
    /// killed by a signal.
    pub status: Option<i32>,
}

impl Capture {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Human-readable reason for a failed query, for diagnostics.
    pub fn failure_reason(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        match self.status {
            Some(code) => format!("query exited with code {code}"),
            None => "query could not be started".to_string(),
        }
    }
}

/// Run a mutating command. Stdout streams through; stderr is captured so a
/// non-zero exit can surface it in the error. Captured stderr from a
/// successful run is replayed so warnings are not lost.
pub fn run_checked(spec: &CommandSpec) -> Result<()> {
    let outcome = cmd(spec.program.as_str(), &spec.args)
        .stderr_capture()
        .unchecked()
        .run();

    match outcome {
        Ok(output) if output.status.success() => {
            if !output.stderr.is_empty() {
                let _ = io::stderr().write_all(&output.stderr);
            }
            Ok(())
        }
        Ok(output) => Err(Error::ExternalCommand {
            command: spec.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        }),
        Err(err) => Err(Error::ExternalCommand {
            command: spec.to_string(),
            code: -1,
            stderr: err.to_string(),
        }),
    }
}

/// Run a read-only query and collect whatever it produced. Never fails; a
/// spawn error yields an empty capture with `status: None`.
pub fn capture(spec: &CommandSpec) -> Capture {
    match cmd(spec.program.as_str(), &spec.args)
        .stdout_capture()
        .stderr_capture()
        .unchecked()
        .run()
    {
        Ok(output) => Capture {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code(),
        },
        Err(err) => Capture {
            stdout: String::new(),
            stderr: err.to_string(),
            status: None,
        },
    }
}
