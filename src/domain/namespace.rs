//! Namespaces: the command path a sub-application is mounted under

use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;

use crate::domain::error::DomainError;

/// Check that `token` can be used as a command, group or parameter name.
pub fn validate_token(token: &str) -> Result<(), DomainError> {
    let invalid = |reason: &str| DomainError::InvalidToken {
        token: token.to_string(),
        reason: reason.to_string(),
    };

    if token.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if token.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace"));
    }
    if token.chars().any(char::is_control) {
        return Err(invalid("must not contain control characters"));
    }
    if token.starts_with('-') {
        return Err(invalid("must not start with '-'"));
    }
    Ok(())
}

/// Ordered, non-empty sequence of command-name segments.
///
/// Derived from a script's path relative to the discovery root:
/// `db/migrate.toml` becomes `db migrate`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Namespace(Vec<String>);

impl Namespace {
    pub fn new<I, S>(segments: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(DomainError::EmptyNamespace);
        }
        for segment in &segments {
            validate_token(segment)?;
        }
        Ok(Self(segments))
    }

    /// Derive a namespace from a path relative to the discovery root.
    ///
    /// Directory components become leading segments; the file name with its
    /// extension stripped becomes the last one.
    pub fn from_relative_path(relative: &Path) -> Result<Self, DomainError> {
        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => segments.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => {
                    return Err(DomainError::InvalidToken {
                        token: relative.display().to_string(),
                        reason: "path must be relative to the discovery root".to_string(),
                    })
                }
            }
        }

        if let Some(last) = segments.last_mut() {
            let stem = Path::new(last.as_str())
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            *last = stem;
        }

        Self::new(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if `self` is a strict prefix of `other`.
    pub fn is_parent_of(&self, other: &Namespace) -> bool {
        self.len() < other.len() && other.0[..self.len()] == self.0[..]
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

impl FromStr for Namespace {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.split_whitespace())
    }
}
