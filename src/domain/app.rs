//! The sub-application contract every script module fulfils

use std::fmt;

use crate::domain::command::{CommandSpec, Invocation};
use crate::domain::error::DomainError;

/// A self-contained set of named commands mounted under one namespace.
///
/// Script files are turned into implementors by a loader; in-process
/// implementors can be registered directly.
pub trait SubApplication {
    /// One-line description shown for the namespace group.
    fn help(&self) -> Option<&str> {
        None
    }

    /// The commands this sub-application exposes.
    fn commands(&self) -> &[CommandSpec];

    /// Run `command` with parsed values and return its exit status.
    ///
    /// A non-zero status is a failure of the command itself; `Err` means
    /// the command body could not be run at all.
    fn invoke(&self, command: &str, invocation: &Invocation) -> Result<i32, DomainError>;
}

/// Outcome of loading one candidate script file.
///
/// Load failures are the `Err` side of the loader's result, so a file that
/// simply does not declare an app stays distinguishable from a broken one.
pub enum LoadOutcome {
    /// The file exposes a sub-application.
    Loaded(Box<dyn SubApplication>),
    /// The file parsed but declares no sub-application; skip it.
    NoApp,
}

impl fmt::Debug for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadOutcome::Loaded(app) => f
                .debug_struct("Loaded")
                .field("commands", &app.commands().len())
                .finish(),
            LoadOutcome::NoApp => f.write_str("NoApp"),
        }
    }
}
