//! A registry that renders nothing.
//!
//! Every trait method behaves exactly as a real rendering layer would from
//! the coordinator's point of view (counts, cursor arithmetic, lifecycle)
//! while touching no GPU.  This is what the binary runs by default, and it
//! is what makes soak runs and benchmarks possible on headless machines.

use framelock_core::Event;
use tracing::debug;

use super::RenderRegistry;

/// Display/frustum bookkeeping with no rendering behind it.
#[derive(Debug)]
pub struct HeadlessRegistry {
    /// Frustums per display, in display order.
    frustums: Vec<usize>,
    /// Buffer swaps since `start`.
    frames: u64,
}

impl HeadlessRegistry {
    /// Creates a registry driving `frustums.len()` displays, each consuming
    /// its own entry's worth of frustums per frame.
    pub fn new(frustums: Vec<usize>) -> Self {
        Self {
            frustums,
            frames: 0,
        }
    }

    /// Buffer swaps since the session started.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl RenderRegistry for HeadlessRegistry {
    fn start(&mut self) -> usize {
        self.frames = 0;
        let total = self.frustums.iter().sum();
        debug!(
            "headless render session started: {} displays, {total} frustums",
            self.frustums.len()
        );
        total
    }

    fn stop(&mut self) {
        debug!("headless render session stopped after {} frames", self.frames);
    }

    fn display_count(&self) -> usize {
        self.frustums.len()
    }

    fn prep(&mut self) {}

    fn draw(&mut self, display: usize, _frustum: usize) -> usize {
        self.frustums.get(display).copied().unwrap_or(0)
    }

    fn test(&mut self, display: usize, _index: i32) -> usize {
        self.frustums.get(display).copied().unwrap_or(0)
    }

    fn overlay(&self) -> Option<usize> {
        None
    }

    fn process_event(&mut self, _event: &Event) -> bool {
        false
    }

    fn calibrate_event(&mut self, _index: i32, _event: &Event) -> bool {
        false
    }

    fn flush(&mut self) {}

    fn present(&mut self) {
        self.frames += 1;
    }
}
