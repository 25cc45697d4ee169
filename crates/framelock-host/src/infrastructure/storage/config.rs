//! TOML-based cluster configuration.
//!
//! One file describes the whole cluster: every node's record lives in the
//! same document, and each process selects its own record by the node tag it
//! was started with.  Copying one file to every machine is the entire
//! deployment story.  Example:
//!
//! ```toml
//! [cluster]
//! default_port = 2827
//!
//! [[node]]
//! name = "head"
//! displays = [{ frustums = 1 }, { frustums = 1 }]
//!
//!   [[node.child]]
//!   name = "left"
//!   host = "projector-l"
//!   launch = true
//!
//! [[node]]
//! name = "left"
//! parent = { host = "head-node" }
//! ```
//!
//! # Node tags (for beginners)
//!
//! A *tag* is just the `name` of a `[[node]]` record.  `framelock-host head`
//! reads the shared file, finds the record named `head`, and becomes that
//! node: listening for the children the record lists, dialing the parent the
//! record names, driving the displays the record declares.  The same binary
//! plays every role.
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return
//! value of `some_fn()` when the field is absent from the TOML file.  A
//! record can therefore be as short as `name = "left"` plus a parent, and a
//! missing file altogether yields a built-in standalone node.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// No `[[node]]` record carries the requested tag.
    #[error("no node named {tag:?} in the cluster configuration")]
    UnknownNode { tag: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level cluster configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterConfig {
    #[serde(default)]
    pub cluster: ClusterSettings,
    #[serde(default, rename = "node")]
    pub nodes: Vec<NodeConfig>,
}

/// Cluster-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterSettings {
    /// Service port used wherever a node record does not name its own.
    #[serde(default = "default_port")]
    pub default_port: u16,
    /// Barrier ack wait limit in milliseconds.  `0` waits forever, which is
    /// the strict lock-step behaviour; anything else turns a dead child into
    /// a timeout error instead of a cluster-wide hang.
    #[serde(default)]
    pub sync_timeout_ms: u64,
}

/// One node's record: its place in the tree plus its render geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeConfig {
    /// The tag a process names to become this node.
    pub name: String,
    /// Listening port for inbound children; absent means the cluster-wide
    /// default port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_port: Option<u16>,
    /// Upstream endpoint; absent means this node is the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentConfig>,
    /// On-screen window geometry for an embedding application.
    #[serde(default)]
    pub window: WindowConfig,
    /// Render buffer size; absent means the window size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer: Option<BufferConfig>,
    /// Displays this node drives.
    #[serde(default = "default_displays")]
    pub displays: Vec<DisplayConfig>,
    /// Children this node expects at census.
    #[serde(default, rename = "child")]
    pub children: Vec<ChildConfig>,
}

/// Where a non-root node finds its parent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParentConfig {
    pub host: String,
    /// Absent means the cluster-wide default port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// On-screen window geometry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WindowConfig {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default = "default_window_width")]
    pub width: u32,
    #[serde(default = "default_window_height")]
    pub height: u32,
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(default = "default_true")]
    pub border: bool,
}

/// Off-screen render buffer size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BufferConfig {
    pub width: u32,
    pub height: u32,
}

/// One display and the frustums it consumes per frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    #[serde(default = "default_frustums")]
    pub frustums: usize,
}

/// One expected child.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChildConfig {
    /// The child's node tag.
    pub name: String,
    /// Machine to reach it on; required when `launch` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Whether this node starts the child itself over ssh.
    #[serde(default)]
    pub launch: bool,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_port() -> u16 {
    2827
}
fn default_window_width() -> u32 {
    1024
}
fn default_window_height() -> u32 {
    768
}
fn default_true() -> bool {
    true
}
fn default_frustums() -> usize {
    1
}
fn default_displays() -> Vec<DisplayConfig> {
    vec![DisplayConfig {
        frustums: default_frustums(),
    }]
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            default_port: default_port(),
            sync_timeout_ms: 0,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: default_window_width(),
            height: default_window_height(),
            fullscreen: false,
            border: default_true(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            listen_port: None,
            parent: None,
            window: WindowConfig::default(),
            buffer: None,
            displays: default_displays(),
            children: Vec::new(),
        }
    }
}

impl Default for ClusterConfig {
    /// A standalone root named `default`: one display, one frustum, no
    /// children, no parent.
    fn default() -> Self {
        Self {
            cluster: ClusterSettings::default(),
            nodes: vec![NodeConfig::default()],
        }
    }
}

// ── Resolution helpers ────────────────────────────────────────────────────────

impl ClusterSettings {
    /// The barrier wait limit, or `None` for the wait-forever lock step.
    pub fn sync_timeout(&self) -> Option<Duration> {
        match self.sync_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

impl ClusterConfig {
    /// Loads the cluster file, or the built-in standalone default when it
    /// does not exist.  Parse errors are real errors.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// The record whose `name` matches `tag`.
    pub fn find_node(&self, tag: &str) -> Result<&NodeConfig, ConfigError> {
        self.nodes
            .iter()
            .find(|node| node.name == tag)
            .ok_or_else(|| ConfigError::UnknownNode {
                tag: tag.to_string(),
            })
    }

    /// A node's listening port, falling back to the cluster default.
    pub fn node_port(&self, node: &NodeConfig) -> u16 {
        node.listen_port.unwrap_or(self.cluster.default_port)
    }

    /// A parent endpoint's port, falling back to the cluster default.
    pub fn parent_port(&self, parent: &ParentConfig) -> u16 {
        parent.port.unwrap_or(self.cluster.default_port)
    }
}

impl NodeConfig {
    /// The render buffer size, falling back to the window size.
    pub fn buffer_size(&self) -> BufferConfig {
        self.buffer.unwrap_or(BufferConfig {
            width: self.window.width,
            height: self.window.height,
        })
    }

    /// Frustums per display, in display order.
    pub fn frustum_layout(&self) -> Vec<usize> {
        self.displays.iter().map(|d| d.frustums).collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
