//! Error conversion helpers for configuration I/O
//!
//! Failures while reading settings or project files abort before discovery,
//! so they all surface as configuration errors naming the offending path.

use std::fmt::Display;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for turning any displayable error into a configuration error.
pub trait ConfigResultExt<T> {
    /// Attach `action` and `path` to the error.
    ///
    /// # Example
    /// ```ignore
    /// fs.read_to_string(&path)
    ///     .config_context("read", &path)?;
    /// ```
    fn config_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T, E: Display> ConfigResultExt<T> for Result<T, E> {
    fn config_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| {
            ApplicationError::config_at(
                format!("{action} {}: {e}", path.display()),
                vec![path.to_path_buf()],
            )
        })
    }
}
