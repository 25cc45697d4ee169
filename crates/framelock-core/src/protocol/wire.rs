//! Whole-event framing over byte streams.
//!
//! TCP delivers a byte stream, not a datagram stream: a single `read` may
//! return half a header, or a payload split across segment boundaries.  The
//! reader here therefore loops until a complete frame is in hand
//! (`read_exact`), so callers only ever observe whole events or an error,
//! never a truncated event.

use std::io::{Read, Write};

use crate::protocol::codec::{decode_event, encode_event, ProtocolError};
use crate::protocol::event::{Event, HEADER_LEN, MAX_PAYLOAD};
use thiserror::Error;

/// Errors surfaced while reading a frame from a stream.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The underlying stream failed or ended.  A clean end-of-stream before
    /// any header byte arrives surfaces as `ErrorKind::UnexpectedEof`.
    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream delivered bytes that do not form a valid event.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Encodes `event` and writes the complete frame to `w`.
pub fn write_event<W: Write>(w: &mut W, event: &Event) -> std::io::Result<()> {
    let frame = encode_event(event);
    w.write_all(&frame)
}

/// Writes an already-encoded frame to `w`.
///
/// This is the fan-out path: encode once with
/// [`encode_event`](crate::protocol::codec::encode_event), then write the
/// same buffer to every destination.
pub fn write_frame<W: Write>(w: &mut W, frame: &[u8]) -> std::io::Result<()> {
    w.write_all(frame)
}

/// Reads exactly one event from `r`, blocking until the frame is complete.
///
/// The 2-byte header is read first; its declared payload length then bounds a
/// second exact read.  Both reads loop over short reads internally, so frames
/// that arrive one byte at a time still decode intact.
pub fn read_event<R: Read>(r: &mut R) -> Result<Event, FrameError> {
    let mut header = [0u8; HEADER_LEN];
    r.read_exact(&mut header)?;

    let declared = header[1] as usize;
    if declared > MAX_PAYLOAD {
        return Err(ProtocolError::Oversize(declared).into());
    }

    let mut frame = vec![0u8; HEADER_LEN + declared];
    frame[..HEADER_LEN].copy_from_slice(&header);
    r.read_exact(&mut frame[HEADER_LEN..])?;

    let (event, _) = decode_event(&frame)?;
    Ok(event)
}
