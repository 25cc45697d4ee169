//! Interactive projector-alignment mode.
//!
//! Physically aligned projector walls drift; calibration mode lets an
//! operator walk the displays one at a time and nudge them while the
//! cluster runs.  The controls are Ctrl-key chords typed on the root:
//!
//! - `Ctrl+Tab` — toggle calibration mode.
//! - `Ctrl+Space` — select the next display (wraps).
//! - `Ctrl+Backspace` — select the previous display (wraps).
//!
//! While the mode is on, every event the chords do not claim is delivered
//! to the selected display through `RenderRegistry::calibrate_event`.
//!
//! The chords arrive through the ordered event stream *after* fan-out, so
//! every node flips its calibration state on the same event and the whole
//! wall stays in step.

use framelock_core::protocol::event::Event;
use tracing::debug;

use crate::infrastructure::registry::RenderRegistry;

/// SDL 1.2 key code for Tab.
pub const KEY_TAB: i32 = 9;
/// SDL 1.2 key code for Space.
pub const KEY_SPACE: i32 = 32;
/// SDL 1.2 key code for Backspace.
pub const KEY_BACKSPACE: i32 = 8;

/// Calibration mode state: whether it is on, and which display is selected.
#[derive(Debug, Default)]
pub struct Calibration {
    active: bool,
    index: i32,
}

/// Wraps a display selection into `0..count`.
fn wrap(index: i32, count: usize) -> i32 {
    if count == 0 {
        0
    } else {
        index.rem_euclid(count as i32)
    }
}

impl Calibration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether calibration mode is on.
    pub fn active(&self) -> bool {
        self.active
    }

    /// The currently selected display index.
    pub fn index(&self) -> i32 {
        self.index
    }

    /// Offers an event to the calibration handler.  Returns `true` when the
    /// event was consumed, either by a chord or by the selected display.
    ///
    /// The selection chords work even while the mode is off, so the selected
    /// display can be staged before the first toggle.
    pub fn handle<R: RenderRegistry>(&mut self, event: &Event, registry: &mut R) -> bool {
        if let Event::Key(key) = event {
            if key.down && key.modifiers.ctrl() {
                match key.key_code {
                    KEY_TAB => {
                        self.active = !self.active;
                        debug!(
                            "calibration mode {}",
                            if self.active { "on" } else { "off" }
                        );
                        return true;
                    }
                    KEY_SPACE => {
                        self.index = wrap(self.index + 1, registry.display_count());
                        debug!("calibration display {}", self.index);
                        return true;
                    }
                    KEY_BACKSPACE => {
                        self.index = wrap(self.index - 1, registry.display_count());
                        debug!("calibration display {}", self.index);
                        return true;
                    }
                    _ => {}
                }
            }
        }

        if self.active {
            return registry.calibrate_event(self.index, event);
        }
        false
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
