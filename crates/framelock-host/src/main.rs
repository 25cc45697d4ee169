//! Cluster host entry point.
//!
//! Reads the shared cluster file, becomes the node named on the command
//! line, and runs the lock-step loop for its role.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ ClusterConfig::load()        -- shared TOML, node record by tag
//!  └─ connect_parent()             -- dial upstream (non-root only)
//!  └─ SocketAcceptor::bind()       -- listen for configured children
//!  └─ spawn_children()             -- ssh bring-up of launch = true children
//!  └─ Coordinator::await_children  -- census: block until all expected join
//!  └─ run_root() / run_node()      -- the lock-step loop, by role
//! ```
//!
//! # Usage
//!
//! ```text
//! framelock-host [TAG] [--config PATH] [--bench] [--frames N]
//!                [--script PATH] [--version]
//! ```
//!
//! `TAG` selects this process's `[[node]]` record and defaults to
//! `default`, which with no config file at all means a standalone headless
//! root.  `--frames N` ends the run after N frames; `--script PATH` replays
//! a scenario file as root input; `--bench` unlocks the clock from wall
//! time.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use framelock_host::application::coordinator::{Coordinator, CoordinatorOptions};
use framelock_host::infrastructure::input::{IdleSource, ScriptedSource};
use framelock_host::infrastructure::launch::{reap_children, spawn_children};
use framelock_host::infrastructure::network::{connect_parent, SocketAcceptor, TransportError};
use framelock_host::infrastructure::registry::HeadlessRegistry;
use framelock_host::infrastructure::storage::config::ClusterConfig;

const USAGE: &str = "usage: framelock-host [TAG] [--config PATH] [--bench] \
                     [--frames N] [--script PATH] [--version]";

/// Parsed command line.
#[derive(Debug, PartialEq)]
struct Args {
    tag: String,
    config: String,
    bench: bool,
    frames: Option<u64>,
    script: Option<String>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            tag: "default".to_string(),
            config: "cluster.toml".to_string(),
            bench: false,
            frames: None,
            script: None,
        }
    }
}

/// Hand-parses the argument list.  `Ok(None)` means an informational flag
/// already handled the invocation.
fn parse_args(argv: &[String]) -> anyhow::Result<Option<Args>> {
    let mut args = Args::default();
    let mut it = argv.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => {
                args.config = it.next().context("--config needs a path")?.clone();
            }
            "--frames" => {
                let count = it.next().context("--frames needs a count")?;
                args.frames = Some(count.parse().context("--frames needs a number")?);
            }
            "--script" => {
                args.script = Some(it.next().context("--script needs a path")?.clone());
            }
            "--bench" => args.bench = true,
            "--version" => {
                println!("framelock-host {}", env!("CARGO_PKG_VERSION"));
                return Ok(None);
            }
            "--help" => {
                println!("{USAGE}");
                return Ok(None);
            }
            flag if flag.starts_with('-') => {
                anyhow::bail!("unknown flag {flag}\n{USAGE}");
            }
            tag => args.tag = tag.to_string(),
        }
    }
    Ok(Some(args))
}

fn main() -> anyhow::Result<()> {
    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&argv)? {
        Some(args) => args,
        None => return Ok(()),
    };

    info!("framelock host starting as node {:?}", args.tag);

    // ── Configuration ─────────────────────────────────────────────────────────
    let config = ClusterConfig::load(&args.config)
        .with_context(|| format!("loading cluster configuration from {}", args.config))?;
    let node = config.find_node(&args.tag)?.clone();

    let registry = HeadlessRegistry::new(node.frustum_layout());
    let options = CoordinatorOptions::from_node(&node, &config.cluster, args.bench);

    // ── Tree construction ─────────────────────────────────────────────────────
    let parent = match node.parent.as_ref() {
        Some(parent) => {
            let port = config.parent_port(parent);
            Some(
                connect_parent(&parent.host, port)
                    .with_context(|| format!("connecting to parent {}:{port}", parent.host))?,
            )
        }
        None => None,
    };

    // Nodes that expect children (or name a port) listen on the service
    // port.  Everything else binds an ephemeral port nobody dials, which
    // keeps the loop code uniform without squatting on the default port.
    let listen_port = if node.children.is_empty() && node.listen_port.is_none() {
        0
    } else {
        config.node_port(&node)
    };
    let mut acceptor =
        SocketAcceptor::bind(listen_port).context("binding the cluster listen port")?;
    if listen_port != 0 {
        info!("listening for children on port {}", acceptor.local_port());
    }

    let launched = spawn_children(&node, &args.config, args.bench);

    let mut coordinator = Coordinator::new(registry, parent, options);
    coordinator
        .await_children(&mut acceptor, node.children.len())
        .context("waiting for configured children to connect")?;

    // ── Run ───────────────────────────────────────────────────────────────────
    let run_result: Result<(), TransportError> = if coordinator.is_root() {
        match args.script.as_deref() {
            Some(path) => {
                let mut input = ScriptedSource::load(path)
                    .with_context(|| format!("loading input script from {path}"))?;
                coordinator.run_root(&mut input, &mut acceptor, args.frames);
            }
            None => {
                coordinator.run_root(&mut IdleSource, &mut acceptor, args.frames);
            }
        }
        Ok(())
    } else {
        if args.script.is_some() {
            warn!("--script is ignored on a non-root node");
        }
        if args.frames.is_some() {
            warn!("--frames is ignored on a non-root node");
        }
        coordinator.run_node()
    };

    info!("cluster session closed after {} frames", coordinator.frames());
    reap_children(launched);

    run_result.context("cluster session failed")?;
    Ok(())
}
