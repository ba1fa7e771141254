//! Application layer: discovery and dispatch services
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod error;
pub mod error_ext;
pub mod services;

pub use error::{ApplicationError, ApplicationResult, DispatchError};
pub use error_ext::ConfigResultExt;
