// SPDX-License-Identifier: GPL-3.0-only

//! External command execution
//!
//! Every provisioning step goes through a [`CommandRunner`], so the sequencing
//! logic can be exercised against a scripted runner instead of real devices.

use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, warn};
use which::which;

use crate::error::{Result, SysError};

/// A program invocation: binary name, arguments and optional stdin payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    stdin: Option<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Feed `input` (followed by a newline) to the program's stdin
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn input(&self) -> Option<&str> {
        self.stdin.as_deref()
    }

    /// Human readable form, used in logs and errors. Never includes stdin.
    pub fn render(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    /// Same invocation, run inside `root` with chroot(8)
    pub fn chrooted(&self, root: &Path) -> Self {
        Self {
            program: "chroot".to_string(),
            args: std::iter::once(root.display().to_string())
                .chain(std::iter::once(self.program.clone()))
                .chain(self.args.iter().cloned())
                .collect(),
            stdin: self.stdin.clone(),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into [`SysError::Command`]
    pub fn check(self, command: &CommandLine) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(SysError::Command {
                command: command.render(),
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Capability to run external programs
pub trait CommandRunner {
    /// Run to completion and capture output.
    ///
    /// Only a failure to start the program is an error here; a non-zero exit
    /// is reported through [`CommandOutput::code`]. A program that is not
    /// installed is [`SysError::ToolMissing`].
    fn output(&self, command: &CommandLine) -> Result<CommandOutput>;

    /// Run, treating a non-zero exit as an error
    fn run(&self, command: &CommandLine) -> Result<()> {
        self.output(command)?.check(command).map(|_| ())
    }

    /// Run and return stdout, treating a non-zero exit as an error
    fn capture(&self, command: &CommandLine) -> Result<String> {
        Ok(self.output(command)?.check(command)?.stdout)
    }

    /// Run inside `root` (which must already hold the runtime bind mounts)
    fn run_in_chroot(&self, root: &Path, command: &CommandLine) -> Result<()> {
        self.run(&command.chrooted(root))
    }
}

/// Runs commands on the host with `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn output(&self, command: &CommandLine) -> Result<CommandOutput> {
        let missing = || SysError::ToolMissing {
            program: command.program().to_string(),
        };
        let binary = which(command.program()).map_err(|_| missing())?;

        debug!("Running {}", command);

        let stdin = if command.input().is_some() {
            Stdio::piped()
        } else {
            // Lets tools such as cryptsetup prompt on the terminal
            Stdio::inherit()
        };

        let mut child = Command::new(binary)
            .args(command.arguments())
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => missing(),
                _ => SysError::Io(e),
            })?;

        if let Some(input) = command.input()
            && let Some(pipe) = child.stdin.take()
        {
            // A program that exits early closes the pipe; its status and
            // stderr are still collected below
            if let Err(e) = feed_stdin(pipe, input)
                && e.kind() != io::ErrorKind::BrokenPipe
            {
                warn!("Writing stdin of {} failed: {e}", command.program());
            }
        }

        let output = child.wait_with_output()?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Write `input` and a trailing newline, then close the pipe
fn feed_stdin(mut pipe: impl Write, input: &str) -> io::Result<()> {
    pipe.write_all(input.as_bytes())?;
    pipe.write_all(b"\n")
}
