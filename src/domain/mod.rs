//! Domain layer: command model, namespaces and the registry
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod app;
pub mod command;
pub mod error;
pub mod namespace;
pub mod registry;
pub mod template;

pub use app::{LoadOutcome, SubApplication};
pub use command::{
    validate_commands, ArgValue, CommandSpec, Invocation, ParamKind, ParamSpec,
};
pub use error::{DiscoveryError, DomainError};
pub use namespace::{validate_token, Namespace};
pub use registry::{Registry, RegistryEntry};
pub use template::RunTemplate;
