//! Registry: namespace -> sub-application, built once per process

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::domain::app::SubApplication;
use crate::domain::command::validate_commands;
use crate::domain::error::{DiscoveryError, DomainError};
use crate::domain::namespace::Namespace;

/// A registered sub-application and the script it came from.
pub struct RegistryEntry {
    pub location: PathBuf,
    pub app: Box<dyn SubApplication>,
}

/// Mapping from namespace to sub-application, plus the scripts that failed to load.
///
/// Keys are unique: a second registration under the same namespace is a
/// collision, never an overwrite.
#[derive(Default)]
pub struct Registry {
    entries: BTreeMap<Namespace, RegistryEntry>,
    failures: Vec<DiscoveryError>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `app` under `namespace`.
    pub fn insert(
        &mut self,
        namespace: Namespace,
        location: impl Into<PathBuf>,
        app: Box<dyn SubApplication>,
    ) -> Result<(), DomainError> {
        let location = location.into();
        validate_commands(app.commands())?;
        let names: Vec<String> = app
            .commands()
            .iter()
            .flat_map(|c| c.names().map(str::to_string))
            .collect();
        self.check_free(&namespace, &location, &names)?;
        self.entries
            .insert(namespace, RegistryEntry { location, app });
        Ok(())
    }

    /// Record a script that failed to load.
    ///
    /// If its namespace is known it still occupies that namespace, so a
    /// collision with it is reported like any other.
    pub fn record_failure(&mut self, failure: DiscoveryError) -> Result<(), DomainError> {
        if let Some(namespace) = &failure.namespace {
            self.check_free(namespace, &failure.path, &[])?;
        }
        self.failures.push(failure);
        Ok(())
    }

    fn check_free(
        &self,
        namespace: &Namespace,
        location: &Path,
        names: &[String],
    ) -> Result<(), DomainError> {
        if let Some(existing) = self.location_of(namespace) {
            return Err(DomainError::NamespaceCollision {
                namespace: namespace.to_string(),
                first: existing.to_path_buf(),
                second: location.to_path_buf(),
            });
        }

        for (other, entry) in &self.entries {
            // existing app's command shadows the new, longer namespace
            if other.is_parent_of(namespace) {
                let next = &namespace.segments()[other.len()];
                if entry.app.commands().iter().any(|c| c.names().any(|n| n == next)) {
                    return Err(DomainError::NamespaceShadowed {
                        namespace: namespace.to_string(),
                        command: next.clone(),
                        first: entry.location.clone(),
                        second: location.to_path_buf(),
                    });
                }
            }
            // new app's command shadows an existing, longer namespace
            if namespace.is_parent_of(other) {
                let next = &other.segments()[namespace.len()];
                if names.iter().any(|n| n == next) {
                    return Err(DomainError::NamespaceShadowed {
                        namespace: other.to_string(),
                        command: next.clone(),
                        first: location.to_path_buf(),
                        second: entry.location.clone(),
                    });
                }
            }
        }

        // a broken script below the new app still owns its namespace
        for failure in &self.failures {
            let Some(other) = &failure.namespace else {
                continue;
            };
            if namespace.is_parent_of(other) {
                let next = &other.segments()[namespace.len()];
                if names.iter().any(|n| n == next) {
                    return Err(DomainError::NamespaceShadowed {
                        namespace: other.to_string(),
                        command: next.clone(),
                        first: location.to_path_buf(),
                        second: failure.path.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn location_of(&self, namespace: &Namespace) -> Option<&Path> {
        self.entries
            .get(namespace)
            .map(|e| e.location.as_path())
            .or_else(|| {
                self.failures
                    .iter()
                    .find(|f| f.namespace.as_ref() == Some(namespace))
                    .map(|f| f.path.as_path())
            })
    }

    pub fn get(&self, namespace: &Namespace) -> Option<&RegistryEntry> {
        self.entries.get(namespace)
    }

    /// Registered namespaces in sorted order.
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Namespace, &RegistryEntry)> {
        self.entries.iter()
    }

    pub fn failures(&self) -> &[DiscoveryError] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("namespaces", &self.entries.keys().collect::<Vec<_>>())
            .field("failures", &self.failures)
            .finish()
    }
}
