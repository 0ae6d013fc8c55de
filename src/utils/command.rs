//! Command execution utilities

use crate::utils::error::{Result, ZaiError};
use crate::utils::signal::is_interrupted;
use std::process::{Command, Output, Stdio};
use tracing::{debug, warn};

/// Execute a command and return the output
pub fn run_command<S: AsRef<str>>(program: &str, args: &[S]) -> Result<Output> {
    let argv: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
    let line = command_line(program, &argv);
    debug!("Running: {}", line);

    let output = Command::new(program)
        .args(&argv)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ZaiError::CommandNotFound(program.to_string())
            } else {
                ZaiError::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        warn!("Command failed: {}\n  stderr: {}", line, stderr.trim());
        return Err(ZaiError::CommandFailed {
            command: line,
            stderr,
        });
    }

    Ok(output)
}

/// Execute a command and return stdout as string
pub fn run_command_output<S: AsRef<str>>(program: &str, args: &[S]) -> Result<String> {
    let output = run_command(program, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Check if a command exists in PATH
pub fn command_exists(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Join a program and its arguments for logs and error messages
pub fn command_line<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(AsRef::as_ref))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Log a command that would be run (for dry-run mode)
pub fn log_dry_run<S: AsRef<str>>(program: &str, args: &[S]) {
    println!("  [dry-run] {}", command_line(program, args));
}

/// Wrapper for command execution that respects dry-run mode
pub struct CommandRunner {
    dry_run: bool,
}

impl CommandRunner {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn run<S: AsRef<str>>(&self, program: &str, args: &[S]) -> Result<Option<Output>> {
        if is_interrupted() {
            return Err(ZaiError::Interrupted);
        }
        if self.dry_run {
            log_dry_run(program, args);
            Ok(None)
        } else {
            run_command(program, args).map(Some)
        }
    }

    pub fn run_output<S: AsRef<str>>(&self, program: &str, args: &[S]) -> Result<Option<String>> {
        if is_interrupted() {
            return Err(ZaiError::Interrupted);
        }
        if self.dry_run {
            log_dry_run(program, args);
            Ok(None)
        } else {
            run_command_output(program, args).map(Some)
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}
