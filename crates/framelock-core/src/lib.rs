//! # framelock-core
//!
//! Shared library for framelock containing the cluster event model, the
//! binary wire codec, stream framing, and the frame clock.
//!
//! This crate is used by every node of a display cluster.  It has zero
//! dependencies on OS APIs, rendering libraries, or network sockets; all I/O
//! goes through the `std::io::Read` / `std::io::Write` traits.
//!
//! # Architecture overview (for beginners)
//!
//! Framelock keeps a group of machines driving one tiled or immersive display
//! (a projector wall, a dome, a CAVE) rendering the *same frame at the same
//! time*.  The machines form a tree: a root node owns the input devices and
//! the clock, and every event the root sees is forwarded down the tree before
//! it takes effect locally, so all nodes replay an identical event stream.
//!
//! This crate is the part of that system every node agrees on:
//!
//! - **`protocol`** – How events travel over the network.  An [`Event`] is
//!   encoded into a compact tagged binary frame (2-byte header + payload) and
//!   decoded back into the same typed value on the other end, bit for bit.
//!
//! - **`domain`** – Pure logic with no OS dependencies.  The
//!   [`FrameClock`](domain::clock::FrameClock) turns elapsed wall time into
//!   the fixed 16 ms ticks that drive animation, and can run detached from
//!   the wall clock for reproducible benchmark runs.

pub mod domain;
pub mod protocol;

pub use domain::clock::{FrameClock, JIFFY_MS};
pub use protocol::codec::{decode_event, encode_event, ProtocolError};
pub use protocol::event::{Event, EventKind, Mods};
pub use protocol::wire::{read_event, write_event, write_frame, FrameError};
