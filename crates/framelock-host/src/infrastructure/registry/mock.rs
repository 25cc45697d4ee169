//! Mock render registry for unit testing.
//!
//! # Why a mock registry?
//!
//! The coordinator's whole job is *when* and *in what order* it calls the
//! rendering layer relative to fan-out and barrier traffic.  A real registry
//! cannot show that, and a headless one discards it.  The `MockRegistry`
//! records every call into a shared `Arc<Mutex<Vec<RegistryCall>>>` so that
//! test assertions can inspect the exact call sequence.
//!
//! The handle is an `Arc` clone because the coordinator takes the registry
//! by value; the test keeps the handle, the coordinator keeps the mock.
//!
//! # Usage in tests
//!
//! ```ignore
//! let mock = MockRegistry::new(vec![1, 1]);
//! let calls = mock.handle();
//! let mut coordinator = Coordinator::new(mock, None, options);
//!
//! coordinator.process_event(&Event::Draw);
//!
//! let recorded = calls.lock().unwrap();
//! assert_eq!(recorded[0], RegistryCall::Prep);
//! ```
//!
//! # `on_process` hook
//!
//! Install a closure to script `process_event` results (and to observe the
//! moment of local dispatch relative to fan-out, by capturing a clock or a
//! channel in the closure).

use std::sync::{Arc, Mutex};

use framelock_core::Event;

use super::RenderRegistry;

/// One recorded registry call, in coordinator dispatch order.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryCall {
    Start,
    Stop,
    Prep,
    Draw { display: usize, frustum: usize },
    Test { display: usize, index: i32 },
    ProcessEvent(Event),
    CalibrateEvent { index: i32, event: Event },
    Flush,
    Present,
}

/// A registry that records all calls without rendering anything.
#[derive(Default)]
pub struct MockRegistry {
    /// Frustums per display, in display order; `start` returns the sum and
    /// `draw`/`test` consume the display's entry.
    pub frustums: Vec<usize>,
    /// What [`RenderRegistry::overlay`] reports.
    pub overlay: Option<usize>,
    /// What [`RenderRegistry::calibrate_event`] returns after recording.
    pub calibrate_result: bool,
    /// When set, scripts the result of `process_event`; otherwise `false`.
    pub on_process: Option<Box<dyn FnMut(&Event) -> bool + Send>>,
    calls: Arc<Mutex<Vec<RegistryCall>>>,
}

impl MockRegistry {
    /// Creates a mock driving `frustums.len()` displays.
    pub fn new(frustums: Vec<usize>) -> Self {
        Self {
            frustums,
            calibrate_result: true,
            ..Self::default()
        }
    }

    /// Clones the shared call log handle.  Take one before moving the mock
    /// into the coordinator.
    pub fn handle(&self) -> Arc<Mutex<Vec<RegistryCall>>> {
        Arc::clone(&self.calls)
    }

    fn record(&self, call: RegistryCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RenderRegistry for MockRegistry {
    fn start(&mut self) -> usize {
        self.record(RegistryCall::Start);
        self.frustums.iter().sum()
    }

    fn stop(&mut self) {
        self.record(RegistryCall::Stop);
    }

    fn display_count(&self) -> usize {
        self.frustums.len()
    }

    fn prep(&mut self) {
        self.record(RegistryCall::Prep);
    }

    fn draw(&mut self, display: usize, frustum: usize) -> usize {
        self.record(RegistryCall::Draw { display, frustum });
        self.frustums.get(display).copied().unwrap_or(0)
    }

    fn test(&mut self, display: usize, index: i32) -> usize {
        self.record(RegistryCall::Test { display, index });
        self.frustums.get(display).copied().unwrap_or(0)
    }

    fn overlay(&self) -> Option<usize> {
        self.overlay
    }

    fn process_event(&mut self, event: &Event) -> bool {
        self.record(RegistryCall::ProcessEvent(event.clone()));
        match self.on_process.as_mut() {
            Some(hook) => hook(event),
            None => false,
        }
    }

    fn calibrate_event(&mut self, index: i32, event: &Event) -> bool {
        self.record(RegistryCall::CalibrateEvent {
            index,
            event: event.clone(),
        });
        self.calibrate_result
    }

    fn flush(&mut self) {
        self.record(RegistryCall::Flush);
    }

    fn present(&mut self) {
        self.record(RegistryCall::Present);
    }
}
