//! Storage infrastructure: cluster configuration loading.
//!
//! This module is a thin adapter between the application and the file
//! system.  The `config` sub-module handles:
//!
//! - Reading the TOML cluster layout file (topology, ports, window and
//!   display geometry).
//! - Selecting this process's own record by node tag.
//! - Providing a built-in single-node default when no file exists, so the
//!   binary runs standalone out of the box.

pub mod config;

pub use config::{ClusterConfig, ConfigError, NodeConfig};
