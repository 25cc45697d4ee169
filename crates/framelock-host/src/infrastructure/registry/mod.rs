//! Render-target registry infrastructure.
//!
//! The coordinator never touches a GPU.  Everything it needs from the
//! rendering layer is behind the [`RenderRegistry`] trait: loop bounds
//! (display and frustum counts), per-frame dispatch (`prep`, `draw`,
//! `present`), and event delivery.  The coordinator treats those counts as
//! plain integers and has no idea what a frustum contains.
//!
//! # Testability
//!
//! The `RenderRegistry` trait lets unit tests observe exactly which render
//! calls the coordinator makes and in what order, via
//! [`mock::MockRegistry`].  The in-tree production implementation is
//! [`headless::HeadlessRegistry`], which renders nothing and makes a whole
//! cluster runnable on machines with no GPU attached.

use framelock_core::Event;

pub mod headless;
pub mod mock;

pub use headless::HeadlessRegistry;
pub use mock::{MockRegistry, RegistryCall};

/// The contract between the coordinator and whatever actually renders.
///
/// Drawing is cursor-based: the coordinator walks displays in order and
/// hands each one the index of the first frustum it has not yet consumed;
/// the display reports how many it took.  That keeps multi-frustum displays
/// (domes, angled walls) out of the coordinator's vocabulary entirely.
pub trait RenderRegistry {
    /// Starts a render session.  Returns the total frustum count the
    /// per-frame cursor will walk.
    fn start(&mut self) -> usize;

    /// Tears the session down.  No other method is called afterwards.
    fn stop(&mut self);

    /// Number of displays this node drives.
    fn display_count(&self) -> usize;

    /// Per-frame cull/update pass, before any display draws.
    fn prep(&mut self);

    /// Draws one display starting at the given frustum cursor.  Returns the
    /// number of frustums consumed.
    fn draw(&mut self, display: usize, frustum: usize) -> usize;

    /// Calibration-pattern variant of [`draw`](Self::draw): renders the
    /// alignment test pattern instead of the scene when `index` selects this
    /// display.
    fn test(&mut self, display: usize, index: i32) -> usize;

    /// Index of the overlay frustum (GUI layer), if one is configured.
    fn overlay(&self) -> Option<usize>;

    /// Offers an event to the rendering layer.  Returns `true` when the
    /// event was consumed.
    fn process_event(&mut self, event: &Event) -> bool;

    /// Delivers an event to the display currently selected for calibration.
    /// Returns `true` when the event was consumed.
    fn calibrate_event(&mut self, index: i32, event: &Event) -> bool;

    /// Finishes all pending GPU work.  Called before `present` when the node
    /// is part of a cluster, so the buffer swap lands inside the barrier
    /// round instead of whenever the driver gets around to it.
    fn flush(&mut self);

    /// Swaps buffers.
    fn present(&mut self);
}
