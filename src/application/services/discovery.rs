//! Discovery service
//!
//! Scans the discovery root for script modules and builds the registry.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace, warn};
use walkdir::{DirEntry, WalkDir};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{DiscoveryError, DomainError, LoadOutcome, Namespace, Registry};
use crate::infrastructure::traits::{FileSystem, ScriptLoader};

/// Service for discovering script modules below a root directory.
pub struct DiscoveryService {
    fs: Arc<dyn FileSystem>,
    loader: Arc<dyn ScriptLoader>,
    extensions: Vec<String>,
    exclude: Vec<String>,
}

impl DiscoveryService {
    /// Create a discovery service considering `*.toml` files.
    pub fn new(fs: Arc<dyn FileSystem>, loader: Arc<dyn ScriptLoader>) -> Self {
        Self {
            fs,
            loader,
            extensions: vec!["toml".to_string()],
            exclude: Vec::new(),
        }
    }

    /// File extensions (without dot) that mark candidate script files.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// File or directory names that are never considered.
    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    /// Scan `root` and build the registry.
    ///
    /// Broken scripts are recorded in the registry and do not stop the scan.
    /// A missing root or a namespace collision fails the whole discovery.
    pub fn discover(&self, root: &Path, recursive: bool) -> ApplicationResult<Registry> {
        debug!("discover: root={} recursive={}", root.display(), recursive);
        if !self.fs.is_dir(root) {
            return Err(ApplicationError::config_at(
                format!("discovery root is not a directory: {}", root.display()),
                vec![root.to_path_buf()],
            ));
        }

        let mut registry = Registry::new();
        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_ignored(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    warn!("discover: cannot read {}: {}", path.display(), e);
                    self.record(&mut registry, DiscoveryError::new(path, None, e.to_string()))?;
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.is_candidate(entry.path()) {
                continue;
            }
            self.visit(&mut registry, root, entry.path())?;
        }

        debug!(
            "discover: {} sub-applications, {} broken",
            registry.len(),
            registry.failures().len()
        );
        Ok(registry)
    }

    fn visit(&self, registry: &mut Registry, root: &Path, path: &Path) -> ApplicationResult<()> {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let namespace = match Namespace::from_relative_path(relative) {
            Ok(ns) => ns,
            Err(e) => {
                warn!("discover: {}: {}", path.display(), e);
                return self.record(registry, DiscoveryError::new(path, None, e.to_string()));
            }
        };

        match self.loader.load(path) {
            Ok(LoadOutcome::Loaded(app)) => {
                trace!("discover: {} -> `{}`", path.display(), namespace);
                match registry.insert(namespace.clone(), path, app) {
                    Ok(()) => Ok(()),
                    Err(e @ DomainError::NamespaceCollision { .. })
                    | Err(e @ DomainError::NamespaceShadowed { .. }) => Err(collision(e)),
                    Err(e) => {
                        warn!("discover: {}: {}", path.display(), e);
                        self.record(
                            registry,
                            DiscoveryError::new(path, Some(namespace), e.to_string()),
                        )
                    }
                }
            }
            Ok(LoadOutcome::NoApp) => {
                trace!("discover: {} declares no app, skipping", path.display());
                Ok(())
            }
            Err(e) => {
                warn!("discover: {}: {}", path.display(), e);
                self.record(
                    registry,
                    DiscoveryError::new(path, Some(namespace), e.to_string()),
                )
            }
        }
    }

    fn record(&self, registry: &mut Registry, failure: DiscoveryError) -> ApplicationResult<()> {
        registry.record_failure(failure).map_err(collision)
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        name.starts_with('.') || self.exclude.iter().any(|x| x.as_str() == name)
    }

    fn is_candidate(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| {
                let ext = ext.to_string_lossy();
                self.extensions
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(&ext))
            })
            .unwrap_or(false)
    }
}

fn collision(e: DomainError) -> ApplicationError {
    let paths = match &e {
        DomainError::NamespaceCollision { first, second, .. }
        | DomainError::NamespaceShadowed { first, second, .. } => {
            vec![first.clone(), second.clone()]
        }
        _ => Vec::new(),
    };
    ApplicationError::config_at(e.to_string(), paths)
}
