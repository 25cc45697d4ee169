//! All framelock cluster event types.
//!
//! Events follow the tagged binary wire format implemented in
//! [`codec`](super::codec): a one-byte kind tag, a one-byte payload length,
//! and a fixed per-kind field sequence.  Tag values are wire-stable; new
//! kinds are only ever appended.

use serde::{Deserialize, Serialize};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Size of the tag + length header prepended to every event on the wire.
pub const HEADER_LEN: usize = 2;

/// Largest payload a frame can carry.  The length byte reserves 255 as
/// invalid, so text payloads are clipped to this many bytes.
pub const MAX_PAYLOAD: usize = 254;

// ── Event kind tags ───────────────────────────────────────────────────────────

/// All event kind tags defined by the wire protocol.
///
/// The numeric values travel on the wire as the first header byte and must
/// never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventKind {
    /// No-op placeholder.
    Null = 0,
    /// 6-DOF tracker pose update.
    Point = 1,
    /// Pointer button transition.
    Click = 2,
    /// Keyboard transition.
    Key = 3,
    /// Analog valuator (joystick axis) motion.
    Axis = 4,
    /// Digital device button transition.
    Button = 5,
    /// Clock advance by a delta in milliseconds.
    Tick = 6,
    /// Render one frame (barrier event).
    Draw = 7,
    /// Present the back buffers.
    Swap = 8,
    /// A line of typed text.
    Input = 9,
    /// Begin-of-session (barrier event).
    Start = 10,
    /// End-of-session (barrier event).
    Close = 11,
    /// Flush pending render work.
    Flush = 12,
    /// Application-defined 64-bit datum.
    User = 13,
}

impl EventKind {
    /// Wire payload length for this kind, or `None` when it is
    /// variable-length (`Input`).
    pub fn payload_len(&self) -> Option<usize> {
        match self {
            EventKind::Null => Some(0),
            EventKind::Point => Some(57),
            EventKind::Click => Some(6),
            EventKind::Key => Some(13),
            EventKind::Axis => Some(10),
            EventKind::Button => Some(3),
            EventKind::Tick => Some(4),
            EventKind::Draw => Some(0),
            EventKind::Swap => Some(0),
            EventKind::Input => None,
            EventKind::Start => Some(0),
            EventKind::Close => Some(0),
            EventKind::Flush => Some(0),
            EventKind::User => Some(8),
        }
    }
}

impl TryFrom<u8> for EventKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventKind::Null),
            1 => Ok(EventKind::Point),
            2 => Ok(EventKind::Click),
            3 => Ok(EventKind::Key),
            4 => Ok(EventKind::Axis),
            5 => Ok(EventKind::Button),
            6 => Ok(EventKind::Tick),
            7 => Ok(EventKind::Draw),
            8 => Ok(EventKind::Swap),
            9 => Ok(EventKind::Input),
            10 => Ok(EventKind::Start),
            11 => Ok(EventKind::Close),
            12 => Ok(EventKind::Flush),
            13 => Ok(EventKind::User),
            _ => Err(()),
        }
    }
}

// ── Modifier word ─────────────────────────────────────────────────────────────

/// Keyboard modifier bitmask carried by [`KeyData`] and [`ClickData`].
///
/// The bit layout is the classic SDL 1.2 keysym modifier word, which is what
/// the events historically carried and what every node agrees on:
///
/// - `0x0001` / `0x0002`: Left / Right Shift
/// - `0x0040` / `0x0080`: Left / Right Ctrl
/// - `0x0100` / `0x0200`: Left / Right Alt
/// - `0x0400` / `0x0800`: Left / Right Meta
/// - `0x1000`: Num Lock, `0x2000`: Caps Lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mods(pub i32);

impl Mods {
    pub const LSHIFT: i32 = 0x0001;
    pub const RSHIFT: i32 = 0x0002;
    pub const LCTRL: i32 = 0x0040;
    pub const RCTRL: i32 = 0x0080;
    pub const LALT: i32 = 0x0100;
    pub const RALT: i32 = 0x0200;
    pub const LMETA: i32 = 0x0400;
    pub const RMETA: i32 = 0x0800;
    pub const NUM: i32 = 0x1000;
    pub const CAPS: i32 = 0x2000;

    pub const SHIFT: i32 = Self::LSHIFT | Self::RSHIFT;
    pub const CTRL: i32 = Self::LCTRL | Self::RCTRL;
    pub const ALT: i32 = Self::LALT | Self::RALT;
    pub const META: i32 = Self::LMETA | Self::RMETA;

    /// Returns `true` if either Ctrl modifier is active.
    pub fn ctrl(&self) -> bool {
        self.0 & Self::CTRL != 0
    }

    /// Returns `true` if either Shift modifier is active.
    pub fn shift(&self) -> bool {
        self.0 & Self::SHIFT != 0
    }

    /// Returns `true` if either Alt modifier is active.
    pub fn alt(&self) -> bool {
        self.0 & Self::ALT != 0
    }
}

// ── Per-kind payload structs ──────────────────────────────────────────────────

/// POINT (1): 6-DOF pose report from a tracked input source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointData {
    /// Which tracked source moved (wand, head sensor, ...).
    pub source: u8,
    /// Position in world units.
    pub position: [f64; 3],
    /// Orientation quaternion, x y z w.
    pub orientation: [f64; 4],
}

/// CLICK (2): pointer button press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickData {
    /// Which pointer button changed.
    pub button: u8,
    /// Modifier word at the time of the transition.
    pub modifiers: Mods,
    /// `true` on press, `false` on release.
    pub down: bool,
}

/// KEY (3): keyboard press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyData {
    /// Translated character code, if printable (0 otherwise).
    pub char_code: i32,
    /// Untranslated key code.
    pub key_code: i32,
    /// Modifier word at the time of the transition.
    pub modifiers: Mods,
    /// `true` on press, `false` on release.
    pub down: bool,
}

/// AXIS (4): analog valuator motion on a gamepad or flystick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisData {
    /// Which input device moved.
    pub device: u8,
    /// Axis index on that device.
    pub axis: u8,
    /// New axis value, nominally in `-1.0..=1.0`.
    pub value: f64,
}

/// BUTTON (5): digital device button press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonData {
    /// Which input device changed.
    pub device: u8,
    /// Button index on that device.
    pub button: u8,
    /// `true` on press, `false` on release.
    pub down: bool,
}

/// TICK (6): advance the simulation clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickData {
    /// Elapsed time this tick represents, in milliseconds.
    pub delta_ms: i32,
}

/// INPUT (9): a line of typed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputData {
    /// The text; at most [`MAX_PAYLOAD`] bytes survive encoding.
    pub text: String,
}

// ── Top-level event enum ──────────────────────────────────────────────────────

/// All valid cluster events, discriminated by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Null,
    Point(PointData),
    Click(ClickData),
    Key(KeyData),
    Axis(AxisData),
    Button(ButtonData),
    Tick(TickData),
    Draw,
    Swap,
    Input(InputData),
    Start,
    Close,
    Flush,
    User(i64),
}

impl Event {
    /// Returns the [`EventKind`] discriminant for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Null => EventKind::Null,
            Event::Point(_) => EventKind::Point,
            Event::Click(_) => EventKind::Click,
            Event::Key(_) => EventKind::Key,
            Event::Axis(_) => EventKind::Axis,
            Event::Button(_) => EventKind::Button,
            Event::Tick(_) => EventKind::Tick,
            Event::Draw => EventKind::Draw,
            Event::Swap => EventKind::Swap,
            Event::Input(_) => EventKind::Input,
            Event::Start => EventKind::Start,
            Event::Close => EventKind::Close,
            Event::Flush => EventKind::Flush,
            Event::User(_) => EventKind::User,
        }
    }
}
