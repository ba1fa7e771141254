//! rsinvoke: discover task scripts and mount them as one command line
//!
//! Script files below a discovery root become sub-applications; their path
//! relative to the root is the namespace their commands are reachable under.
//!
//! Layers:
//! - `domain`: command model, namespaces, registry (no I/O)
//! - `application`: discovery and dispatch services
//! - `infrastructure`: filesystem, process and script-loading boundaries
//! - `cli`: root options and process-level wiring

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
