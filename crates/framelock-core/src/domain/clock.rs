//! The fixed-step frame clock.
//!
//! Animation in a display cluster is driven by `Tick` events carrying a fixed
//! 16 ms delta, not by each node reading its own wall clock.  Only the root
//! node owns a `FrameClock`; everyone else receives the ticks it emits, so
//! all nodes advance their simulations by identical amounts in identical
//! order.

/// Milliseconds per tick at the nominal 60 Hz frame rate.
///
/// Integer division is deliberate: the legacy wire protocol always carried
/// 16, never 16.67, and every node must keep agreeing on that.
pub const JIFFY_MS: u64 = 1000 / 60;

/// Accumulates elapsed wall time and reports it as whole jiffies.
///
/// The clock never reads system time itself; the caller passes a millisecond
/// reading in.  That keeps it trivial to test and lets **bench mode** detach
/// from real time entirely: a benched clock reports exactly one jiffy per
/// call regardless of the wall clock, so a run of N frames performs an
/// identical event sequence every time, however fast the hardware is.
#[derive(Debug)]
pub struct FrameClock {
    /// Timestamp up to which ticks have already been issued.
    tock: u64,
    /// When set, ignore wall time and report one jiffy per call.
    bench: bool,
    started: bool,
}

impl FrameClock {
    pub fn new(bench: bool) -> Self {
        Self {
            tock: 0,
            bench,
            started: false,
        }
    }

    /// Anchors the accumulator at `now_ms`.  Until this is called,
    /// [`advance`](Self::advance) reports zero jiffies (one in bench mode).
    pub fn start(&mut self, now_ms: u64) {
        self.tock = now_ms;
        self.started = true;
    }

    /// Returns the number of whole jiffies elapsed since the last call and
    /// consumes them from the accumulator.
    ///
    /// The anchor advances by whole jiffies only, so remainder milliseconds
    /// are carried into the next call rather than discarded; over time the
    /// tick stream tracks the wall clock with no drift.
    pub fn advance(&mut self, now_ms: u64) -> u32 {
        if self.bench {
            return 1;
        }
        if !self.started || now_ms < self.tock {
            return 0;
        }
        let jiffies = (now_ms - self.tock) / JIFFY_MS;
        self.tock += jiffies * JIFFY_MS;
        jiffies as u32
    }

    /// Whether this clock is detached from wall time.
    pub fn is_bench(&self) -> bool {
        self.bench
    }
}
