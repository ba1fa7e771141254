//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::DiscoveryService;
use crate::config::Settings;
use crate::infrastructure::script::{ShellConfig, TomlScriptLoader};
use crate::infrastructure::traits::{
    CommandRunner, FileSystem, RealCommandRunner, RealFileSystem, ScriptLoader,
};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Command runner abstraction
    pub cmd: Arc<dyn CommandRunner>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(RealCommandRunner),
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        cmd: Arc<dyn CommandRunner>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self { settings, fs, cmd }
    }

    /// Loader for script modules, running command bodies through the configured shell.
    pub fn script_loader(&self) -> Arc<dyn ScriptLoader> {
        let shell = ShellConfig {
            program: self.settings.shell.clone(),
            args: self.settings.shell_args.clone(),
        };
        Arc::new(TomlScriptLoader::new(
            self.fs.clone(),
            self.cmd.clone(),
            shell,
        ))
    }

    /// Discovery service honouring the configured extensions and excludes.
    pub fn discovery_service(&self) -> DiscoveryService {
        DiscoveryService::new(self.fs.clone(), self.script_loader())
            .with_extensions(self.settings.extensions.clone())
            .with_exclude(self.settings.exclude.clone())
    }
}
