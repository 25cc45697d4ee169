//! Input source infrastructure for the root node.
//!
//! Only the root owns real input and real time; everything downstream sees
//! input as forwarded events.  The [`InputSource`] trait is the seam the
//! root's frame loop polls, and it is deliberately non-blocking: input must
//! never stall a frame, the frame loop owns the pacing.
//!
//! # Testability
//!
//! [`ScriptedSource`](script::ScriptedSource) replays a TOML scenario
//! deterministically, which is how integration tests and benchmarks drive a
//! cluster without devices.  [`IdleSource`] is the no-device default.

use framelock_core::Event;

pub mod script;

pub use script::{ScriptError, ScriptedSource};

/// Non-blocking producer of input events for the root frame loop.
pub trait InputSource {
    /// Returns the next event due at or before `frame`, or `None` when the
    /// source has nothing pending.  Called repeatedly each loop iteration
    /// until it returns `None`.
    fn poll(&mut self, frame: u64) -> Option<Event>;
}

/// An input source with no devices behind it.
#[derive(Debug, Default)]
pub struct IdleSource;

impl InputSource for IdleSource {
    fn poll(&mut self, _frame: u64) -> Option<Event> {
        None
    }
}
