//! Shared foundation crate: error taxonomy, configuration, and common
//! newtypes consumed by every other `filedex-*` crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::FiledexConfig;
pub use error::{Error, Result};
