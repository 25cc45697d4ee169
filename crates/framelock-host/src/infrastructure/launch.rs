//! Remote bring-up of child node processes.
//!
//! The operator runs one command on the head machine; every child record
//! marked `launch = true` is started over `ssh` with the same binary name,
//! its own node tag, and the shared configuration path.  This is bring-up
//! only: no restarts, no health checks.  A child that dies stays dead until
//! the operator intervenes, and a launch failure is a warning because the
//! operator may prefer to start that node by hand.

use std::process::{Child, Command, Stdio};

use tracing::{info, warn};

use super::storage::config::NodeConfig;

/// Builds the `ssh` invocation for one child.
fn launch_command(host: &str, tag: &str, config_path: &str, bench: bool) -> Command {
    let mut command = Command::new("ssh");
    command
        .arg(host)
        .arg("framelock-host")
        .arg(tag)
        .arg("--config")
        .arg(config_path);
    if bench {
        command.arg("--bench");
    }
    // The remote process must never compete for the terminal's stdin.
    command.stdin(Stdio::null());
    command
}

/// Starts every `launch = true` child of this node over ssh.
///
/// Returns the spawned handles so the caller can reap them after the
/// cluster closes.  Failures are logged and skipped.
pub fn spawn_children(node: &NodeConfig, config_path: &str, bench: bool) -> Vec<Child> {
    let mut launched = Vec::new();
    for child in &node.children {
        if !child.launch {
            continue;
        }
        let host = match child.host.as_deref() {
            Some(host) => host,
            None => {
                warn!("child {} has launch = true but no host, skipping", child.name);
                continue;
            }
        };
        match launch_command(host, &child.name, config_path, bench).spawn() {
            Ok(process) => {
                info!("launched {} on {host} (pid {})", child.name, process.id());
                launched.push(process);
            }
            Err(e) => warn!("could not launch {} on {host}: {e}", child.name),
        }
    }
    launched
}

/// Waits for launched children after the cluster has closed.  Best effort.
pub fn reap_children(launched: Vec<Child>) {
    for mut process in launched {
        match process.wait() {
            Ok(status) if status.success() => {}
            Ok(status) => warn!("launched child exited with {status}"),
            Err(e) => warn!("could not reap launched child: {e}"),
        }
    }
}
