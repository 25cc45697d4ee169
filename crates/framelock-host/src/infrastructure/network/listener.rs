//! TCP acceptor for inbound child connections.

use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use tracing::{info, warn};

use super::{LinkAcceptor, SocketLink, TransportError};

/// Delay between bind attempts while the port is still held by a dying
/// previous instance.
const BIND_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Bind attempts before giving up on a busy port (ten seconds total).
const BIND_RETRY_LIMIT: u32 = 40;

/// A blocking TCP implementation of [`LinkAcceptor`].
#[derive(Debug)]
pub struct SocketAcceptor {
    listener: TcpListener,
    addr: SocketAddr,
}

impl SocketAcceptor {
    /// Binds the cluster listening port on all interfaces.
    ///
    /// A node restarted right after a crash often finds its own port lingering
    /// in TIME_WAIT, so `AddrInUse` is retried for a bounded window before it
    /// becomes fatal.
    pub fn bind(port: u16) -> Result<Self, TransportError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let mut attempts = 0;
        let listener = loop {
            match TcpListener::bind(addr) {
                Ok(listener) => break listener,
                Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                    attempts += 1;
                    if attempts >= BIND_RETRY_LIMIT {
                        return Err(TransportError::Bind { addr, source: e });
                    }
                    if attempts == 1 {
                        info!("port {port} busy, waiting for it to free up");
                    }
                    std::thread::sleep(BIND_RETRY_DELAY);
                }
                Err(source) => return Err(TransportError::Bind { addr, source }),
            }
        };

        // With port 0 the OS picks; report what we actually got.
        let addr = listener.local_addr().map_err(|source| TransportError::Bind {
            addr,
            source,
        })?;
        Ok(Self { listener, addr })
    }

    /// The port actually bound.  Differs from the requested one only when
    /// binding port 0.
    pub fn local_port(&self) -> u16 {
        self.addr.port()
    }

    fn set_nonblocking(&self, on: bool) {
        if let Err(e) = self.listener.set_nonblocking(on) {
            warn!("could not toggle non-blocking accept on {}: {e}", self.addr);
        }
    }
}

impl LinkAcceptor for SocketAcceptor {
    type Link = SocketLink;

    fn accept(&mut self) -> Result<SocketLink, TransportError> {
        self.set_nonblocking(false);
        match self.listener.accept() {
            Ok((stream, peer)) => Ok(SocketLink::new(stream, peer.to_string())),
            Err(source) => Err(TransportError::Accept {
                addr: self.addr.to_string(),
                source,
            }),
        }
    }

    fn poll_accept(&mut self) -> Result<Option<SocketLink>, TransportError> {
        self.set_nonblocking(true);
        match self.listener.accept() {
            Ok((stream, peer)) => Ok(Some(SocketLink::new(stream, peer.to_string()))),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(source) => Err(TransportError::Accept {
                addr: self.addr.to_string(),
                source,
            }),
        }
    }

    fn local_addr(&self) -> String {
        self.addr.to_string()
    }
}
