//! Binary codec for encoding and decoding framelock cluster events.
//!
//! Wire format:
//! ```text
//! [kind:1][payload_len:1][payload:N]
//! ```
//! The payload is a fixed per-kind field sequence.  All multi-byte integers
//! are big-endian.  Doubles travel as the two 32-bit halves of their IEEE-754
//! bit pattern, most-significant half first, each half big-endian; `i64`
//! values use the same halving.  This module is the only place that byte
//! layout appears.

use crate::protocol::event::{
    AxisData, ButtonData, ClickData, Event, EventKind, InputData, KeyData, Mods, PointData,
    TickData, HEADER_LEN, MAX_PAYLOAD,
};
use thiserror::Error;

/// Errors that can occur during event encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the frame it claims to hold.
    /// `context` names what was being decoded at the time.
    #[error("truncated {context}: need {needed} bytes, got {available}")]
    Truncated {
        context: &'static str,
        needed: usize,
        available: usize,
    },

    /// The kind byte in the header is not a recognized value.
    #[error("unknown event kind: 0x{0:02X}")]
    UnknownKind(u8),

    /// The declared payload length can never be valid (255).
    #[error("declared payload length {0} exceeds the 254-byte limit")]
    Oversize(usize),

    /// The declared payload length does not match the fixed size of the kind.
    #[error("payload length mismatch for {kind:?}: header says {declared}, expected {expected}")]
    LengthMismatch {
        kind: EventKind,
        declared: usize,
        expected: usize,
    },

    /// An `Input` payload is not valid UTF-8.
    #[error("malformed text payload: {0}")]
    MalformedText(String),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes an [`Event`] into a byte vector including the 2-byte header.
///
/// Encoding is infallible: every fixed field always fits its wire width, and
/// text longer than [`MAX_PAYLOAD`] bytes is clipped at a character boundary.
/// The returned frame can be written verbatim to any number of peers, so a
/// fan-out encodes once and reuses the buffer.
///
/// # Examples
///
/// ```rust
/// use framelock_core::protocol::{decode_event, encode_event};
/// use framelock_core::protocol::event::{Event, TickData};
///
/// let event = Event::Tick(TickData { delta_ms: 16 });
/// let bytes = encode_event(&event);
/// let (decoded, consumed) = decode_event(&bytes).unwrap();
/// assert_eq!(decoded, event);
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn encode_event(event: &Event) -> Vec<u8> {
    let payload = encode_payload(event);

    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.push(event.kind() as u8);
    buf.push(payload.len() as u8);
    buf.extend_from_slice(&payload);
    buf
}

/// Decodes one [`Event`] from the beginning of `bytes`.
///
/// Returns the decoded event and the total number of bytes consumed (header
/// plus declared payload), so the caller can advance their read cursor.  A
/// frame whose payload disagrees with the declared length is rejected; the
/// decoder never consumes more or fewer payload bytes than the header
/// declares.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the bytes are malformed.
pub fn decode_event(bytes: &[u8]) -> Result<(Event, usize), ProtocolError> {
    if bytes.len() < HEADER_LEN {
        return Err(ProtocolError::Truncated {
            context: "header",
            needed: HEADER_LEN,
            available: bytes.len(),
        });
    }

    let kind_byte = bytes[0];
    let kind = EventKind::try_from(kind_byte).map_err(|_| ProtocolError::UnknownKind(kind_byte))?;

    let declared = bytes[1] as usize;
    if declared > MAX_PAYLOAD {
        return Err(ProtocolError::Oversize(declared));
    }
    if let Some(expected) = kind.payload_len() {
        if declared != expected {
            return Err(ProtocolError::LengthMismatch {
                kind,
                declared,
                expected,
            });
        }
    }

    let total = HEADER_LEN + declared;
    if bytes.len() < total {
        return Err(ProtocolError::Truncated {
            context: "payload",
            needed: total,
            available: bytes.len(),
        });
    }

    let payload = &bytes[HEADER_LEN..total];
    let event = decode_payload(kind, payload)?;
    Ok((event, total))
}

// ── Payload encoding ──────────────────────────────────────────────────────────

fn encode_payload(event: &Event) -> Vec<u8> {
    let mut buf = Vec::new();
    match event {
        Event::Null
        | Event::Draw
        | Event::Swap
        | Event::Start
        | Event::Close
        | Event::Flush => {} // empty payload
        Event::Point(d) => encode_point(&mut buf, d),
        Event::Click(d) => encode_click(&mut buf, d),
        Event::Key(d) => encode_key(&mut buf, d),
        Event::Axis(d) => encode_axis(&mut buf, d),
        Event::Button(d) => encode_button(&mut buf, d),
        Event::Tick(d) => put_word(&mut buf, d.delta_ms),
        Event::Input(d) => put_text(&mut buf, &d.text),
        Event::User(value) => put_long(&mut buf, *value),
    }
    buf
}

// ── Payload decoding ──────────────────────────────────────────────────────────

fn decode_payload(kind: EventKind, payload: &[u8]) -> Result<Event, ProtocolError> {
    match kind {
        EventKind::Null => Ok(Event::Null),
        EventKind::Point => decode_point(payload).map(Event::Point),
        EventKind::Click => decode_click(payload).map(Event::Click),
        EventKind::Key => decode_key(payload).map(Event::Key),
        EventKind::Axis => decode_axis(payload).map(Event::Axis),
        EventKind::Button => decode_button(payload).map(Event::Button),
        EventKind::Tick => {
            require_len(payload, 4, "Tick")?;
            Ok(Event::Tick(TickData {
                delta_ms: get_word(payload, 0),
            }))
        }
        EventKind::Draw => Ok(Event::Draw),
        EventKind::Swap => Ok(Event::Swap),
        EventKind::Input => {
            let text = String::from_utf8(payload.to_vec())
                .map_err(|e| ProtocolError::MalformedText(e.to_string()))?;
            Ok(Event::Input(InputData { text }))
        }
        EventKind::Start => Ok(Event::Start),
        EventKind::Close => Ok(Event::Close),
        EventKind::Flush => Ok(Event::Flush),
        EventKind::User => {
            require_len(payload, 8, "User")?;
            Ok(Event::User(get_long(payload, 0)))
        }
    }
}

// ── Per-kind encode helpers ───────────────────────────────────────────────────

fn encode_point(buf: &mut Vec<u8>, d: &PointData) {
    buf.push(d.source);
    for v in &d.position {
        put_real(buf, *v);
    }
    for v in &d.orientation {
        put_real(buf, *v);
    }
}

fn encode_click(buf: &mut Vec<u8>, d: &ClickData) {
    buf.push(d.button);
    put_word(buf, d.modifiers.0);
    buf.push(if d.down { 0x01 } else { 0x00 });
}

fn encode_key(buf: &mut Vec<u8>, d: &KeyData) {
    put_word(buf, d.char_code);
    put_word(buf, d.key_code);
    put_word(buf, d.modifiers.0);
    buf.push(if d.down { 0x01 } else { 0x00 });
}

fn encode_axis(buf: &mut Vec<u8>, d: &AxisData) {
    buf.push(d.device);
    buf.push(d.axis);
    put_real(buf, d.value);
}

fn encode_button(buf: &mut Vec<u8>, d: &ButtonData) {
    buf.push(d.device);
    buf.push(d.button);
    buf.push(if d.down { 0x01 } else { 0x00 });
}

// ── Per-kind decode helpers ───────────────────────────────────────────────────

fn decode_point(p: &[u8]) -> Result<PointData, ProtocolError> {
    // 1 (source) + 3*8 (position) + 4*8 (orientation) = 57
    require_len(p, 57, "Point")?;
    Ok(PointData {
        source: p[0],
        position: [get_real(p, 1), get_real(p, 9), get_real(p, 17)],
        orientation: [
            get_real(p, 25),
            get_real(p, 33),
            get_real(p, 41),
            get_real(p, 49),
        ],
    })
}

fn decode_click(p: &[u8]) -> Result<ClickData, ProtocolError> {
    // 1 (button) + 4 (modifiers) + 1 (down) = 6
    require_len(p, 6, "Click")?;
    Ok(ClickData {
        button: p[0],
        modifiers: Mods(get_word(p, 1)),
        down: p[5] != 0,
    })
}

fn decode_key(p: &[u8]) -> Result<KeyData, ProtocolError> {
    // 4 (char) + 4 (key) + 4 (modifiers) + 1 (down) = 13
    require_len(p, 13, "Key")?;
    Ok(KeyData {
        char_code: get_word(p, 0),
        key_code: get_word(p, 4),
        modifiers: Mods(get_word(p, 8)),
        down: p[12] != 0,
    })
}

fn decode_axis(p: &[u8]) -> Result<AxisData, ProtocolError> {
    // 1 (device) + 1 (axis) + 8 (value) = 10
    require_len(p, 10, "Axis")?;
    Ok(AxisData {
        device: p[0],
        axis: p[1],
        value: get_real(p, 2),
    })
}

fn decode_button(p: &[u8]) -> Result<ButtonData, ProtocolError> {
    // 1 (device) + 1 (button) + 1 (down) = 3
    require_len(p, 3, "Button")?;
    Ok(ButtonData {
        device: p[0],
        button: p[1],
        down: p[2] != 0,
    })
}

// ── Field codecs ──────────────────────────────────────────────────────────────

fn put_word(buf: &mut Vec<u8>, v: i32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

/// Writes an `f64` as two big-endian 32-bit halves of its bit pattern,
/// most-significant half first.  The halving is the wire contract; a plain
/// 8-byte big-endian write happens to produce the same bytes, but peers
/// decode half by half.
fn put_real(buf: &mut Vec<u8>, v: f64) {
    let bits = v.to_bits();
    buf.extend_from_slice(&((bits >> 32) as u32).to_be_bytes());
    buf.extend_from_slice(&(bits as u32).to_be_bytes());
}

/// Writes an `i64` with the same two-half scheme as [`put_real`].
fn put_long(buf: &mut Vec<u8>, v: i64) {
    let bits = v as u64;
    buf.extend_from_slice(&((bits >> 32) as u32).to_be_bytes());
    buf.extend_from_slice(&(bits as u32).to_be_bytes());
}

/// Writes text as raw bytes with no terminator, clipped to [`MAX_PAYLOAD`]
/// bytes at a UTF-8 character boundary.
fn put_text(buf: &mut Vec<u8>, text: &str) {
    let mut end = text.len().min(MAX_PAYLOAD);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    buf.extend_from_slice(&text.as_bytes()[..end]);
}

fn get_word(p: &[u8], off: usize) -> i32 {
    i32::from_be_bytes([p[off], p[off + 1], p[off + 2], p[off + 3]])
}

fn get_real(p: &[u8], off: usize) -> f64 {
    let hi = u32::from_be_bytes([p[off], p[off + 1], p[off + 2], p[off + 3]]);
    let lo = u32::from_be_bytes([p[off + 4], p[off + 5], p[off + 6], p[off + 7]]);
    f64::from_bits(((hi as u64) << 32) | lo as u64)
}

fn get_long(p: &[u8], off: usize) -> i64 {
    let hi = u32::from_be_bytes([p[off], p[off + 1], p[off + 2], p[off + 3]]);
    let lo = u32::from_be_bytes([p[off + 4], p[off + 5], p[off + 6], p[off + 7]]);
    (((hi as u64) << 32) | lo as u64) as i64
}

fn require_len(p: &[u8], needed: usize, context: &'static str) -> Result<(), ProtocolError> {
    if p.len() < needed {
        return Err(ProtocolError::Truncated {
            context,
            needed,
            available: p.len(),
        });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
