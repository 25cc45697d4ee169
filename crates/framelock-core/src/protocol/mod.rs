//! Protocol module containing the event model, the binary codec, and stream
//! framing.

pub mod codec;
pub mod event;
pub mod wire;

pub use codec::{decode_event, encode_event, ProtocolError};
pub use event::*;
pub use wire::{read_event, write_event, write_frame, FrameError};
