//! In-process [`EventLink`]s over `std::sync::mpsc`.
//!
//! Tests drive the coordinator with these instead of sockets: same framing,
//! same barrier semantics, no ports.  Frames and acks travel on separate
//! channels exactly as they occupy separate positions in the TCP stream.

use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use framelock_core::protocol::codec::decode_event;
use framelock_core::Event;

use super::{EventLink, LinkAcceptor, TransportError, ACK_BYTE};

/// One end of an in-process link pair.
#[derive(Debug)]
pub struct LoopbackLink {
    label: String,
    frame_tx: Sender<Vec<u8>>,
    frame_rx: Receiver<Vec<u8>>,
    ack_tx: Sender<u8>,
    ack_rx: Receiver<u8>,
}

/// Creates a crossed pair of links: what one end sends, the other receives.
///
/// Each label becomes the [`EventLink::label`] of the corresponding link, so
/// pass the name of the peer that link points at.
pub fn loopback_pair(a_label: &str, b_label: &str) -> (LoopbackLink, LoopbackLink) {
    let (a_frame_tx, b_frame_rx) = channel();
    let (b_frame_tx, a_frame_rx) = channel();
    let (a_ack_tx, b_ack_rx) = channel();
    let (b_ack_tx, a_ack_rx) = channel();

    let a = LoopbackLink {
        label: a_label.to_string(),
        frame_tx: a_frame_tx,
        frame_rx: a_frame_rx,
        ack_tx: a_ack_tx,
        ack_rx: a_ack_rx,
    };
    let b = LoopbackLink {
        label: b_label.to_string(),
        frame_tx: b_frame_tx,
        frame_rx: b_frame_rx,
        ack_tx: b_ack_tx,
        ack_rx: b_ack_rx,
    };
    (a, b)
}

impl LoopbackLink {
    fn closed(&self) -> TransportError {
        TransportError::Closed {
            peer: self.label.clone(),
        }
    }

    /// Test support: takes one queued frame without blocking, or `None`
    /// when the queue is empty.
    pub fn try_recv_event(&mut self) -> Option<Event> {
        self.frame_rx
            .try_recv()
            .ok()
            .map(|frame| decode_event(&frame).expect("well-formed frame").0)
    }
}

impl EventLink for LoopbackLink {
    fn label(&self) -> &str {
        &self.label
    }

    fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.frame_tx
            .send(frame.to_vec())
            .map_err(|_| self.closed())
    }

    fn recv_event(&mut self) -> Result<Event, TransportError> {
        let frame = self.frame_rx.recv().map_err(|_| self.closed())?;
        let (event, _) = decode_event(&frame).map_err(|source| TransportError::Protocol {
            peer: self.label.clone(),
            source,
        })?;
        Ok(event)
    }

    fn send_ack(&mut self) -> Result<(), TransportError> {
        self.ack_tx.send(ACK_BYTE).map_err(|_| self.closed())
    }

    fn recv_ack(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        match timeout {
            None => self.ack_rx.recv().map(|_| ()).map_err(|_| self.closed()),
            Some(limit) => match self.ack_rx.recv_timeout(limit) {
                Ok(_) => Ok(()),
                Err(RecvTimeoutError::Timeout) => Err(TransportError::Timeout {
                    peer: self.label.clone(),
                }),
                Err(RecvTimeoutError::Disconnected) => Err(self.closed()),
            },
        }
    }

    fn drain(&mut self) {
        while self.frame_rx.try_recv().is_ok() {}
        while self.ack_rx.try_recv().is_ok() {}
    }
}

// ── Hub ───────────────────────────────────────────────────────────────────────

/// An in-process [`LinkAcceptor`].
///
/// A test builds link pairs with [`loopback_pair`] and pushes one end through
/// the returned sender; the coordinator under test accepts them here.
#[derive(Debug)]
pub struct LoopbackHub {
    label: String,
    pending: Receiver<LoopbackLink>,
}

/// Creates a hub and the sender that feeds it.
pub fn loopback_hub(label: &str) -> (Sender<LoopbackLink>, LoopbackHub) {
    let (tx, pending) = channel();
    (
        tx,
        LoopbackHub {
            label: label.to_string(),
            pending,
        },
    )
}

impl LoopbackHub {
    fn hub_gone(&self) -> TransportError {
        TransportError::Accept {
            addr: self.label.clone(),
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "hub disconnected"),
        }
    }
}

impl LinkAcceptor for LoopbackHub {
    type Link = LoopbackLink;

    fn accept(&mut self) -> Result<LoopbackLink, TransportError> {
        self.pending.recv().map_err(|_| self.hub_gone())
    }

    fn poll_accept(&mut self) -> Result<Option<LoopbackLink>, TransportError> {
        match self.pending.try_recv() {
            Ok(link) => Ok(Some(link)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(self.hub_gone()),
        }
    }

    fn local_addr(&self) -> String {
        self.label.clone()
    }
}
