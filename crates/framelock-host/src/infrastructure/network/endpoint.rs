//! TCP channel endpoints.
//!
//! `SocketLink` wraps one `TcpStream` with the whole-event framing from
//! `framelock_core` and converts every failure into a [`TransportError`]
//! naming the peer.  `connect_parent` dials upstream, retrying while the
//! parent process is still coming up.

use std::io::Read;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use framelock_core::protocol::wire::{self, FrameError};
use framelock_core::Event;
use tracing::{debug, info, warn};

use super::{EventLink, HostLookupError, TransportError, ACK_BYTE};

/// Delay between connection attempts while the parent is not listening yet.
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(250);

/// A blocking TCP implementation of [`EventLink`].
#[derive(Debug)]
pub struct SocketLink {
    stream: TcpStream,
    peer: String,
}

impl SocketLink {
    /// Wraps an established stream.
    ///
    /// The stream is forced into blocking mode (accepted sockets can inherit
    /// the listener's non-blocking flag) and `TCP_NODELAY` is set: barrier
    /// acks and fan-out frames are tiny, and letting Nagle's algorithm batch
    /// them would stretch every frame.
    pub fn new(stream: TcpStream, peer: String) -> Self {
        if let Err(e) = stream.set_nonblocking(false) {
            warn!("could not set {peer} blocking: {e}");
        }
        if let Err(e) = stream.set_nodelay(true) {
            warn!("could not set TCP_NODELAY for {peer}: {e}");
        }
        Self { stream, peer }
    }
}

impl EventLink for SocketLink {
    fn label(&self) -> &str {
        &self.peer
    }

    fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        wire::write_frame(&mut self.stream, frame).map_err(|source| TransportError::Send {
            peer: self.peer.clone(),
            source,
        })
    }

    fn recv_event(&mut self) -> Result<Event, TransportError> {
        match wire::read_event(&mut self.stream) {
            Ok(event) => Ok(event),
            Err(FrameError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(TransportError::Closed {
                    peer: self.peer.clone(),
                })
            }
            Err(FrameError::Io(source)) => Err(TransportError::Recv {
                peer: self.peer.clone(),
                source,
            }),
            Err(FrameError::Protocol(source)) => Err(TransportError::Protocol {
                peer: self.peer.clone(),
                source,
            }),
        }
    }

    fn send_ack(&mut self) -> Result<(), TransportError> {
        wire::write_frame(&mut self.stream, &[ACK_BYTE]).map_err(|source| {
            TransportError::Send {
                peer: self.peer.clone(),
                source,
            }
        })
    }

    fn recv_ack(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        if let Err(e) = self.stream.set_read_timeout(timeout) {
            warn!("could not set read timeout for {}: {e}", self.peer);
        }

        let mut ack = [0u8; 1];
        let result = match self.stream.read_exact(&mut ack) {
            Ok(()) => Ok(()),
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                Err(TransportError::Timeout {
                    peer: self.peer.clone(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(TransportError::Closed {
                    peer: self.peer.clone(),
                })
            }
            Err(source) => Err(TransportError::Recv {
                peer: self.peer.clone(),
                source,
            }),
        };

        // Event reads must block indefinitely again afterwards.
        if let Err(e) = self.stream.set_read_timeout(None) {
            warn!("could not clear read timeout for {}: {e}", self.peer);
        }
        result
    }

    fn drain(&mut self) {
        let mut sink = [0u8; 256];
        loop {
            match self.stream.read(&mut sink) {
                Ok(0) | Err(_) => break,
                Ok(_) => continue,
            }
        }
    }
}

/// Resolves `host:port` to the first address record.
fn resolve(host: &str, port: u16) -> Result<SocketAddr, HostLookupError> {
    let mut addrs = (host, port).to_socket_addrs().map_err(|source| HostLookupError {
        host: host.to_string(),
        source,
    })?;
    addrs.next().ok_or_else(|| HostLookupError {
        host: host.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no address records"),
    })
}

/// Dials the parent node's listening port.
///
/// Cluster processes start in arbitrary order, so a refused connection means
/// the parent simply is not listening yet; this keeps retrying until it is.
/// Any other failure, including name resolution, is immediately fatal.
pub fn connect_parent(host: &str, port: u16) -> Result<SocketLink, TransportError> {
    let addr = resolve(host, port)?;
    let peer = format!("{host}:{port}");

    let mut waiting = false;
    loop {
        match TcpStream::connect(addr) {
            Ok(stream) => {
                info!("connected to parent at {peer}");
                return Ok(SocketLink::new(stream, peer));
            }
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                if !waiting {
                    info!("waiting for parent at {peer}");
                    waiting = true;
                } else {
                    debug!("parent at {peer} still not listening");
                }
                std::thread::sleep(CONNECT_RETRY_DELAY);
            }
            Err(source) => return Err(TransportError::Connect { addr, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_lookup_failure_names_the_host() {
        let err = resolve("no-such-host.invalid", 2827).unwrap_err();
        assert_eq!(err.host, "no-such-host.invalid");
    }

    #[test]
    fn test_socket_link_round_trips_events() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind must succeed");
        let addr = listener.local_addr().expect("addr must resolve");

        let handle = std::thread::spawn(move || {
            let (stream, peer) = listener.accept().expect("accept must succeed");
            let mut link = SocketLink::new(stream, peer.to_string());
            let event = link.recv_event().expect("recv must succeed");
            link.send_ack().expect("ack must succeed");
            event
        });

        let stream = TcpStream::connect(addr).expect("connect must succeed");
        let mut link = SocketLink::new(stream, addr.to_string());
        let event = Event::User(42);
        link.send_frame(&framelock_core::encode_event(&event))
            .expect("send must succeed");
        link.recv_ack(Some(Duration::from_secs(5)))
            .expect("ack must arrive");

        assert_eq!(handle.join().expect("peer thread must finish"), event);
    }

    #[test]
    fn test_recv_ack_times_out_against_silent_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind must succeed");
        let addr = listener.local_addr().expect("addr must resolve");

        let stream = TcpStream::connect(addr).expect("connect must succeed");
        let mut link = SocketLink::new(stream, addr.to_string());
        // Keep the accepted end alive but silent.
        let (_silent, _) = listener.accept().expect("accept must succeed");

        match link.recv_ack(Some(Duration::from_millis(50))) {
            Err(TransportError::Timeout { peer }) => assert_eq!(peer, addr.to_string()),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_recv_against_closed_peer_reports_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind must succeed");
        let addr = listener.local_addr().expect("addr must resolve");

        let stream = TcpStream::connect(addr).expect("connect must succeed");
        let mut link = SocketLink::new(stream, addr.to_string());
        drop(listener.accept().expect("accept must succeed"));

        match link.recv_event() {
            Err(TransportError::Closed { peer }) => assert_eq!(peer, addr.to_string()),
            other => panic!("expected closed, got {other:?}"),
        }
    }
}
