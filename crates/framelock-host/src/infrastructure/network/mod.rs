//! Network infrastructure for the cluster coordinator.
//!
//! # Sub-modules
//!
//! - **`endpoint`** – `SocketLink`, the TCP implementation of [`EventLink`],
//!   plus `connect_parent` for dialing upstream with name resolution and
//!   connect retry.
//!
//! - **`listener`** – `SocketAcceptor`, the TCP implementation of
//!   [`LinkAcceptor`].  Binds with retry (the port may linger in TIME_WAIT
//!   from a previous run) and switches between blocking census accepts and
//!   non-blocking steady-state polling.
//!
//! - **`loopback`** – In-process link pairs over `std::sync::mpsc`, used by
//!   unit and integration tests to exercise the coordinator without sockets.

use std::net::SocketAddr;
use std::time::Duration;

use framelock_core::protocol::codec::ProtocolError;
use framelock_core::protocol::event::Event;
use thiserror::Error;

pub mod endpoint;
pub mod listener;
pub mod loopback;

pub use endpoint::{connect_parent, SocketLink};
pub use listener::SocketAcceptor;
pub use loopback::{loopback_hub, loopback_pair, LoopbackHub, LoopbackLink};

/// The single barrier acknowledgement byte.
///
/// Barrier acks deliberately travel outside the event framing: one raw byte
/// per child per barrier, nothing to parse.
pub const ACK_BYTE: u8 = 0;

// ── Error taxonomy ────────────────────────────────────────────────────────────

/// Name resolution failed for a configured peer address.
#[derive(Debug, Error)]
#[error("host lookup failed for {host}: {source}")]
pub struct HostLookupError {
    /// The configured host name that did not resolve.
    pub host: String,
    #[source]
    pub source: std::io::Error,
}

/// Errors surfaced by channel endpoints and acceptors.
///
/// Every steady-state variant names the peer it concerns, and every variant
/// that wraps an OS failure keeps it as the source, so a log line or an
/// `anyhow` chain always says both *who* and *why*.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Lookup(#[from] HostLookupError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to accept on {addr}: {source}")]
    Accept {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("send to {peer} failed: {source}")]
    Send {
        peer: String,
        #[source]
        source: std::io::Error,
    },

    #[error("recv from {peer} failed: {source}")]
    Recv {
        peer: String,
        #[source]
        source: std::io::Error,
    },

    /// The peer closed its end of the connection.
    #[error("{peer} closed the connection")]
    Closed { peer: String },

    /// The peer sent bytes that do not decode as an event.
    #[error("protocol violation from {peer}: {source}")]
    Protocol {
        peer: String,
        #[source]
        source: ProtocolError,
    },

    /// An ack wait exceeded the configured barrier timeout.
    #[error("timed out waiting for {peer}")]
    Timeout { peer: String },
}

// ── Seam traits ───────────────────────────────────────────────────────────────

/// A duplex, blocking, whole-event channel to one peer of the cluster tree.
///
/// The coordinator owns one link per child plus at most one link to its
/// parent, and drives all of them from a single thread with blocking calls;
/// lock-step rendering gets its pacing from those blocking waits, not from
/// any scheduler.
pub trait EventLink {
    /// Peer identity used in logs and errors.
    fn label(&self) -> &str;

    /// Writes one already-encoded frame.  A fan-out encodes the event once
    /// and passes the same buffer to every child.
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Blocks until one whole event has arrived.
    fn recv_event(&mut self) -> Result<Event, TransportError>;

    /// Sends the single barrier acknowledgement byte.
    fn send_ack(&mut self) -> Result<(), TransportError>;

    /// Blocks until the peer's barrier acknowledgement byte arrives.  With a
    /// timeout, a silent peer yields [`TransportError::Timeout`] instead of
    /// a hang.
    fn recv_ack(&mut self, timeout: Option<Duration>) -> Result<(), TransportError>;

    /// Reads and discards until the peer closes, so the peer's socket shuts
    /// down first during the orderly teardown handshake.  Best effort.
    fn drain(&mut self) {}
}

/// Produces inbound [`EventLink`]s from child nodes.
///
/// Admission is two-phase: a blocking [`accept`](Self::accept) per expected
/// child during census, then non-blocking
/// [`poll_accept`](Self::poll_accept) from the running frame loop, where an
/// empty backlog is `Ok(None)` and must never stall a frame.
pub trait LinkAcceptor {
    type Link: EventLink;

    /// Blocks until the next child connects.
    fn accept(&mut self) -> Result<Self::Link, TransportError>;

    /// Returns a pending connection if one is queued, without blocking.
    fn poll_accept(&mut self) -> Result<Option<Self::Link>, TransportError>;

    /// Listening address for logs.
    fn local_addr(&self) -> String;
}
