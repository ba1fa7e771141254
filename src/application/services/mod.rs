//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, ScriptLoader)
//! but are themselves concrete structs, not traits.

mod aggregator;
mod discovery;
mod listing;

pub use aggregator::{build_root, build_root_with, RootApplication, DEFAULT_BIN_NAME};
pub use discovery::DiscoveryService;
pub use listing::command_tree;
