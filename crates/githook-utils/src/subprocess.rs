use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use tracing::debug;

use crate::error::UtilError;
use crate::Result;

/// Stdio mode for subprocess streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdioMode {
    /// Pipe the stream (capture it).
    Pipe,
    /// Redirect to /dev/null.
    Null,
}

impl StdioMode {
    fn to_stdio(self) -> Stdio {
        match self {
            StdioMode::Pipe => Stdio::piped(),
            StdioMode::Null => Stdio::null(),
        }
    }
}

/// Result of running a subprocess to completion.
#[derive(Debug)]
pub struct GitCommandResult {
    /// The exit status.
    pub status: ExitStatus,
    /// Captured stdout (empty if not piped).
    pub stdout: Vec<u8>,
    /// Captured stderr (empty if not piped).
    pub stderr: Vec<u8>,
}

impl GitCommandResult {
    /// Returns true if the process exited successfully.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Stdout decoded lossily with surrounding whitespace removed.
    pub fn stdout_trimmed(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }

    /// Stderr decoded lossily with surrounding whitespace removed.
    pub fn stderr_trimmed(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Builder for git plumbing invocations.
///
/// Wraps `std::process::Command` with a fluent API. The builder is cheap to
/// clone so a configured base (program, working directory, environment) can be
/// reused for every query against one repository.
#[derive(Debug, Clone)]
pub struct GitCommand {
    program: OsString,
    args: Vec<OsString>,
    env_vars: Vec<(OsString, OsString)>,
    stdin_mode: StdioMode,
    stdout_mode: StdioMode,
    stderr_mode: StdioMode,
    working_dir: Option<PathBuf>,
}

impl GitCommand {
    /// Create a new command builder for the given program.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            env_vars: Vec::new(),
            stdin_mode: StdioMode::Null,
            stdout_mode: StdioMode::Pipe,
            stderr_mode: StdioMode::Pipe,
            working_dir: None,
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Self {
        for arg in args {
            self.args.push(arg.as_ref().to_os_string());
        }
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<OsStr>, val: impl AsRef<OsStr>) -> Self {
        self.env_vars
            .push((key.as_ref().to_os_string(), val.as_ref().to_os_string()));
        self
    }

    /// Set stdin mode.
    pub fn stdin(mut self, mode: StdioMode) -> Self {
        self.stdin_mode = mode;
        self
    }

    /// Set stdout mode.
    pub fn stdout(mut self, mode: StdioMode) -> Self {
        self.stdout_mode = mode;
        self
    }

    /// Set stderr mode.
    pub fn stderr(mut self, mode: StdioMode) -> Self {
        self.stderr_mode = mode;
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, val) in &self.env_vars {
            cmd.env(key, val);
        }
        cmd.stdin(self.stdin_mode.to_stdio());
        cmd.stdout(self.stdout_mode.to_stdio());
        cmd.stderr(self.stderr_mode.to_stdio());
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// The command line as a single string, for logs and error messages.
    pub fn command_string(&self) -> String {
        let mut s = self.program.to_string_lossy().to_string();
        for arg in &self.args {
            s.push(' ');
            s.push_str(&arg.to_string_lossy());
        }
        s
    }

    fn spawn_with(&self, cmd: &mut Command) -> Result<Child> {
        debug!(command = %self.command_string(), "spawning");
        cmd.spawn().map_err(|e| UtilError::Spawn {
            command: self.command_string(),
            source: e,
        })
    }

    /// Run the command and wait for it to complete, capturing output.
    pub fn run(&self) -> Result<GitCommandResult> {
        let mut cmd = self.build_command();
        let child = self.spawn_with(&mut cmd)?;
        let output = child
            .wait_with_output()
            .map_err(|e| UtilError::Subprocess {
                command: self.command_string(),
                source: e,
            })?;
        Ok(GitCommandResult {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    /// Run the command with `input` written to its stdin, capturing output.
    ///
    /// Stdin is fed from a scoped helper thread while this thread drains
    /// stdout and stderr, so an input larger than the pipe buffer cannot
    /// deadlock against a child that answers line by line.
    pub fn run_with_input(&self, input: &[u8]) -> Result<GitCommandResult> {
        let mut cmd = self.clone().stdin(StdioMode::Pipe).build_command();
        let mut child = self.spawn_with(&mut cmd)?;
        let stdin = child.stdin.take();

        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || -> std::io::Result<()> {
                if let Some(mut stdin) = stdin {
                    stdin.write_all(input)?;
                    stdin.flush()?;
                }
                Ok(())
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            (written, output)
        });

        let output = output.map_err(|e| UtilError::Subprocess {
            command: self.command_string(),
            source: e,
        })?;
        written.map_err(|e| UtilError::Stdin {
            command: self.command_string(),
            source: e,
        })?;
        Ok(GitCommandResult {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    /// Spawn the command without waiting for it to complete.
    pub fn spawn(&self) -> Result<Child> {
        let mut cmd = self.build_command();
        self.spawn_with(&mut cmd)
    }
}
