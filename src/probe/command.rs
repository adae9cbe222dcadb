//! External command collaborator.
//!
//! # Responsibilities
//! - Spawn the mount inspection command for exactly one target
//! - Hand back raw exit code and output bytes without interpreting them
//! - Report whether the command exists at all
//!
//! # Design Decisions
//! - Deadlines are enforced by the caller; the child is spawned with
//!   `kill_on_drop` so dropping the future reaps it
//! - Exit-code classification and parsing live in the executor, not here

use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

/// Exit code `findmnt` uses when the target is not a mount point.
pub const NOT_FOUND_EXIT_CODE: i32 = 1;

/// Raw outcome of one command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    pub fn exit(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code: Some(code),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync + 'static {
    /// Run the inspection command for `target`.
    async fn run(&self, target: &str) -> io::Result<CommandOutput>;

    /// True if the command can be found on this host.
    fn is_available(&self) -> bool;

    /// Version string reported by the command.
    async fn version(&self) -> io::Result<String>;
}

/// Runs `findmnt -n -o TARGET,FSTYPE,OPTIONS,SOURCE --mountpoint <target>`.
#[derive(Debug, Clone)]
pub struct FindmntRunner {
    program: String,
}

impl FindmntRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for FindmntRunner {
    fn default() -> Self {
        Self::new("findmnt")
    }
}

#[async_trait]
impl CommandRunner for FindmntRunner {
    async fn run(&self, target: &str) -> io::Result<CommandOutput> {
        let output = Command::new(&self.program)
            .args(["-n", "-o", "TARGET,FSTYPE,OPTIONS,SOURCE", "--mountpoint"])
            .arg(target)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    fn is_available(&self) -> bool {
        find_executable(&self.program)
    }

    async fn version(&self) -> io::Result<String> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(io::Error::other(format!(
                "failed to get {} version: {}",
                self.program, output.status
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let line = text
            .lines()
            .find(|line| line.contains("from util-linux"))
            .unwrap_or_else(|| text.trim());
        Ok(line.trim().to_string())
    }
}

/// Resolve `program` the way a shell would: paths are checked directly,
/// bare names are searched on `PATH`.
fn find_executable(program: &str) -> bool {
    if program.contains('/') {
        return is_executable(Path::new(program));
    }

    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| is_executable(&dir.join(OsStr::new(program))))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_unavailable() {
        let runner = FindmntRunner::new("definitely-not-a-real-command-4f1c");
        assert!(!runner.is_available());
        assert!(!FindmntRunner::new("/nonexistent/bin/findmnt").is_available());
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_is_available() {
        assert!(FindmntRunner::new("sh").is_available());
        assert!(FindmntRunner::new("/bin/sh").is_available());
    }

    #[tokio::test]
    async fn test_spawn_failure_is_io_error() {
        let runner = FindmntRunner::new("definitely-not-a-real-command-4f1c");
        assert!(runner.run("/").await.is_err());
    }

    #[test]
    fn test_output_constructors() {
        let ok = CommandOutput::success("/ ext4 rw /dev/sda1\n");
        assert_eq!(ok.exit_code, Some(0));
        let missing = CommandOutput::exit(NOT_FOUND_EXIT_CODE, "");
        assert_eq!(missing.exit_code, Some(1));
        assert!(missing.stdout.is_empty());
    }
}
