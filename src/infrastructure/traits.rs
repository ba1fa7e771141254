//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::io;
use std::path::Path;

use crate::domain::{DomainError, LoadOutcome};

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Check if path is a directory.
    fn is_dir(&self, path: &Path) -> bool;
}

/// External command runner abstraction.
pub trait CommandRunner: Send + Sync {
    /// Run a program with inherited stdio and extra environment variables.
    ///
    /// Returns the exit code; a process killed by a signal reports
    /// `128 + signal` like a shell does.
    fn run(&self, program: &str, args: &[String], env: &[(String, String)]) -> io::Result<i32>;
}

/// Turns one candidate script file into a sub-application.
///
/// Three outcomes are kept apart: a loaded app, a file without an app
/// (`NoApp`, skipped), and a broken file (`Err`, recorded).
pub trait ScriptLoader {
    fn load(&self, path: &Path) -> Result<LoadOutcome, DomainError>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// Real command runner implementation.
#[derive(Debug, Default)]
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run(&self, program: &str, args: &[String], env: &[(String, String)]) -> io::Result<i32> {
        let status = std::process::Command::new(program)
            .args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .status()?;

        if let Some(code) = status.code() {
            return Ok(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Ok(128 + signal);
            }
        }

        Ok(crate::exitcode::SOFTWARE)
    }
}
