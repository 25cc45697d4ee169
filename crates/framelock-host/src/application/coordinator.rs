//! The cluster coordinator: lock-step event distribution over a node tree.
//!
//! Every process in the cluster runs one [`Coordinator`].  The root owns
//! real input and real time; every other node owns a parent link and some
//! displays.  Lock step falls out of two rules applied to every event:
//!
//! 1. **Fan-out first.**  An event is forwarded to all children before any
//!    local side effect.  Each child applies the same rule, so the entire
//!    tree observes one global total order of events.
//!
//! 2. **Barrier after the expensive phases.**  `Start`, `Draw` and `Close`
//!    are followed by `sync()`: one acknowledgement byte from every child,
//!    then one byte up to the parent.  The recursion makes this a tree-wide
//!    rendezvous, so no node can run ahead into the next frame.
//!
//! ```text
//!            root ──── event ───▶ node A ──── event ───▶ node A1
//!             ▲                     │  ▲                    │
//!             │                  dispatch │                 │
//!             └───── ack ◀──────────┘  └────── ack ◀────────┘
//! ```
//!
//! `Swap` deliberately carries no barrier: the draw barrier has already
//! aligned the nodes, and the swap itself must not wait on the network or
//! the projectors visibly stutter.  When a node is part of a cluster it
//! flushes the GPU pipeline before presenting, so queued render work cannot
//! smear the lock step.
//!
//! The coordinator is single-threaded by construction: all link I/O is
//! blocking calls from the owning thread, and the pacing of the whole
//! cluster comes from those blocking waits.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use framelock_core::domain::clock::FrameClock;
use framelock_core::protocol::event::TickData;
use framelock_core::{encode_event, Event, JIFFY_MS};
use tracing::{info, trace, warn};

use crate::application::calibration::Calibration;
use crate::infrastructure::input::InputSource;
use crate::infrastructure::network::{EventLink, LinkAcceptor, TransportError};
use crate::infrastructure::registry::RenderRegistry;
use crate::infrastructure::storage::config::{
    BufferConfig, ClusterSettings, NodeConfig, WindowConfig,
};

/// Milliseconds since the first call.  The virtual clock only ever works
/// with differences, so the epoch is arbitrary.
fn now_ms() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_millis() as u64
}

// ── Phase machine ─────────────────────────────────────────────────────────────

/// Coordinator lifecycle phase.
///
/// `Init` lasts until the `Start` event has been dispatched; `Running` is
/// the steady frame loop; `ShuttingDown` covers the `Close` barrier; and a
/// `Closed` coordinator does nothing ever again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Running,
    ShuttingDown,
    Closed,
}

// ── Options ───────────────────────────────────────────────────────────────────

/// Per-node settings the coordinator carries.
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Benchmark mode: the virtual clock advances exactly one jiffy per
    /// frame regardless of wall time.
    pub bench: bool,
    /// Barrier ack wait limit; `None` waits forever.
    pub sync_timeout: Option<Duration>,
    /// On-screen window geometry for an embedding application.
    pub window: WindowConfig,
    /// Render buffer size for an embedding application.
    pub buffer: BufferConfig,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        let window = WindowConfig::default();
        Self {
            bench: false,
            sync_timeout: None,
            buffer: BufferConfig {
                width: window.width,
                height: window.height,
            },
            window,
        }
    }
}

impl CoordinatorOptions {
    /// Builds options from a node's configuration record.
    pub fn from_node(node: &NodeConfig, settings: &ClusterSettings, bench: bool) -> Self {
        Self {
            bench,
            sync_timeout: settings.sync_timeout(),
            window: node.window,
            buffer: node.buffer_size(),
        }
    }
}

// ── Coordinator ───────────────────────────────────────────────────────────────

/// One node's place in the cluster tree, and the state machine that drives
/// it.
pub struct Coordinator<L: EventLink, R: RenderRegistry> {
    parent: Option<L>,
    /// Set when the parent link dies inside the barrier; `run_node` turns
    /// it into an orderly teardown on its next iteration.
    parent_error: Option<TransportError>,
    children: Vec<L>,
    registry: R,
    calibration: Calibration,
    clock: FrameClock,
    phase: Phase,
    frustum_count: usize,
    frames: u64,
    options: CoordinatorOptions,
}

impl<L: EventLink, R: RenderRegistry> Coordinator<L, R> {
    /// Creates a coordinator in `Phase::Init`.  `parent` is `None` exactly
    /// when this node is the root.
    pub fn new(registry: R, parent: Option<L>, options: CoordinatorOptions) -> Self {
        let clock = FrameClock::new(options.bench);
        Self {
            parent,
            parent_error: None,
            children: Vec::new(),
            registry,
            calibration: Calibration::new(),
            clock,
            phase: Phase::Init,
            frustum_count: 0,
            frames: 0,
            options,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// `true` when this node has no parent.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Frames completed since `Start`.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Total frustums reported by the registry at `Start`.
    pub fn frustum_count(&self) -> usize {
        self.frustum_count
    }

    /// Overlay frustum index, if the registry has one.
    pub fn overlay_frustum(&self) -> Option<usize> {
        self.registry.overlay()
    }

    /// Window geometry from this node's configuration record.
    pub fn window(&self) -> WindowConfig {
        self.options.window
    }

    /// Render buffer size from this node's configuration record.
    pub fn buffer(&self) -> BufferConfig {
        self.options.buffer
    }

    fn is_clustered(&self) -> bool {
        self.parent.is_some() || !self.children.is_empty()
    }

    // ── Admission ─────────────────────────────────────────────────────────────

    /// Attaches a child during census.  The topology is fixed once `Start`
    /// has been dispatched, so anything later is rejected.
    pub fn adopt(&mut self, child: L) {
        if self.phase != Phase::Init {
            warn!("rejecting child {} after census", child.label());
            return;
        }
        info!("adopted child {}", child.label());
        self.children.push(child);
    }

    /// Blocks until `expected` children have connected.
    ///
    /// Census is fatal on accept failure: a node missing part of its
    /// configured subtree cannot usefully join the lock step.
    pub fn await_children<A>(&mut self, acceptor: &mut A, expected: usize) -> Result<(), TransportError>
    where
        A: LinkAcceptor<Link = L>,
    {
        while self.children.len() < expected {
            let child = acceptor.accept()?;
            info!(
                "child {} joined ({}/{expected})",
                child.label(),
                self.children.len() + 1
            );
            self.children.push(child);
        }
        Ok(())
    }

    /// Drains the accept backlog without blocking.  Connections arriving
    /// after census are rejected: admitting one mid-frame would desynchronize
    /// the event stream it never saw the start of.
    pub fn poll_admission<A>(&mut self, acceptor: &mut A)
    where
        A: LinkAcceptor<Link = L>,
    {
        loop {
            match acceptor.poll_accept() {
                Ok(Some(link)) => warn!("rejecting late joiner {}", link.label()),
                Ok(None) => break,
                Err(e) => {
                    warn!("admission poll failed: {e}");
                    break;
                }
            }
        }
    }

    // ── Event processing ──────────────────────────────────────────────────────

    /// Processes one event: fan-out to every child first, then local
    /// dispatch.  All transport failures degrade (the failing link is
    /// dropped with a warning); processing itself never fails.
    pub fn process_event(&mut self, event: &Event) {
        trace!("processing {:?}", event.kind());
        self.fan_out(event);
        self.dispatch(event);
    }

    /// Encodes the event once and sends the identical frame to every child
    /// in admission order.  A child that cannot be written to is dropped.
    fn fan_out(&mut self, event: &Event) {
        if self.children.is_empty() {
            return;
        }
        let frame = encode_event(event);
        self.children.retain_mut(|child| match child.send_frame(&frame) {
            Ok(()) => true,
            Err(e) => {
                warn!("dropping child: {e}");
                false
            }
        });
    }

    fn dispatch(&mut self, event: &Event) {
        match event {
            Event::Start => {
                self.frustum_count = self.registry.start();
                self.clock.start(now_ms());
                self.phase = Phase::Running;
                info!(
                    "session started: {} frustums over {} displays",
                    self.frustum_count,
                    self.registry.display_count()
                );
                self.sync();
            }
            Event::Draw => {
                if self.phase == Phase::Running {
                    self.draw_pass();
                }
                self.sync();
            }
            Event::Swap => {
                if self.phase == Phase::Running {
                    if self.is_clustered() {
                        self.registry.flush();
                    }
                    self.registry.present();
                    self.frames += 1;
                }
            }
            Event::Flush => {
                if self.phase == Phase::Running {
                    self.registry.flush();
                }
            }
            Event::Close => {
                self.phase = Phase::ShuttingDown;
                self.registry.stop();
                self.sync();
                self.teardown();
                self.phase = Phase::Closed;
                info!("session closed after {} frames", self.frames);
            }
            _ => self.offer(event),
        }
    }

    /// Offers an ordinary event to the calibration handler, then to the
    /// registry.
    fn offer(&mut self, event: &Event) {
        if self.phase != Phase::Running {
            return;
        }
        if !self.calibration.handle(event, &mut self.registry) {
            self.registry.process_event(event);
        }
    }

    /// The tree-wide barrier: collect one ack byte from every child, then
    /// send one up to the parent.
    ///
    /// Runs after `Start`, `Draw` and `Close` only.  A root with no children
    /// returns immediately (nothing to collect, nowhere to report).  A child
    /// that fails the barrier is dropped; a parent that fails is dropped
    /// too, and the failure is recorded so the node's run loop can still
    /// tear its own subtree down in order.
    fn sync(&mut self) {
        let timeout = self.options.sync_timeout;
        self.children.retain_mut(|child| match child.recv_ack(timeout) {
            Ok(()) => true,
            Err(e) => {
                warn!("dropping child at barrier: {e}");
                false
            }
        });

        if let Some(parent) = self.parent.as_mut() {
            if let Err(e) = parent.send_ack() {
                warn!("lost parent at barrier: {e}");
                self.parent = None;
                self.parent_error = Some(e);
            }
        }
    }

    /// Renders every display once, walking the frustum cursor by each
    /// display's consumed count.  In calibration mode the test pattern is
    /// rendered for the selected display index instead.
    fn draw_pass(&mut self) {
        self.registry.prep();
        let mut frusi = 0;
        for display in 0..self.registry.display_count() {
            frusi += if self.calibration.active() {
                self.registry.test(display, self.calibration.index())
            } else {
                self.registry.draw(display, frusi)
            };
        }
    }

    /// Drains each child link to EOF before dropping it, so the children's
    /// sockets shut down first.
    fn teardown(&mut self) {
        for child in &mut self.children {
            child.drain();
        }
        self.children.clear();
    }

    // ── Run loops ─────────────────────────────────────────────────────────────

    /// The non-root loop: receive from the parent, process, repeat until
    /// `Close` has been dispatched.
    ///
    /// A parent failure before `Close` synthesizes a local `Close` so this
    /// node's subtree still tears down in order, then surfaces the error.
    /// That holds for both failure sites: a dead receive here, and a failed
    /// ack inside the barrier, which `sync` records for this loop to find.
    pub fn run_node(&mut self) -> Result<(), TransportError> {
        while self.phase != Phase::Closed {
            let received = match self.parent.as_mut() {
                Some(parent) => parent.recv_event(),
                None => match self.parent_error.take() {
                    Some(e) => Err(e),
                    None => return Ok(()),
                },
            };
            match received {
                Ok(event) => self.process_event(&event),
                Err(e) => {
                    warn!("lost parent mid-session: {e}");
                    self.parent = None;
                    self.process_event(&Event::Close);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// The root loop: inject input, generate time, render, repeat.
    ///
    /// Each iteration drains the input source, rejects any late joiners,
    /// advances the virtual clock (emitting one `Tick` per elapsed jiffy),
    /// and runs the `Draw`/`Swap` pair.  In wall-clock mode an iteration
    /// where no jiffy has elapsed idles briefly instead of rendering.
    ///
    /// The loop ends when the input source delivers `Close` or when
    /// `max_frames` is reached, which synthesizes one.
    pub fn run_root<I, A>(&mut self, input: &mut I, acceptor: &mut A, max_frames: Option<u64>)
    where
        I: InputSource,
        A: LinkAcceptor<Link = L>,
    {
        self.process_event(&Event::Start);

        while self.phase != Phase::Closed {
            while let Some(event) = input.poll(self.frames) {
                self.process_event(&event);
                if self.phase == Phase::Closed {
                    return;
                }
            }

            self.poll_admission(acceptor);

            let jiffies = self.clock.advance(now_ms());
            if jiffies == 0 {
                std::thread::sleep(Duration::from_millis(1));
                continue;
            }
            let tick = Event::Tick(TickData {
                delta_ms: JIFFY_MS as i32,
            });
            for _ in 0..jiffies {
                self.process_event(&tick);
            }

            self.process_event(&Event::Draw);
            self.process_event(&Event::Swap);

            if let Some(limit) = max_frames {
                if self.frames >= limit {
                    info!("frame limit {limit} reached");
                    self.process_event(&Event::Close);
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::input::IdleSource;
    use crate::infrastructure::network::loopback::{loopback_hub, loopback_pair, LoopbackLink};
    use crate::infrastructure::registry::{MockRegistry, RegistryCall};
    use framelock_core::protocol::event::{KeyData, Mods};

    fn make_options() -> CoordinatorOptions {
        CoordinatorOptions {
            bench: true,
            ..CoordinatorOptions::default()
        }
    }

    fn make_root(registry: MockRegistry) -> Coordinator<LoopbackLink, MockRegistry> {
        Coordinator::new(registry, None, make_options())
    }

    fn make_chord(key_code: i32) -> Event {
        Event::Key(KeyData {
            char_code: 0,
            key_code,
            modifiers: Mods(Mods::CTRL),
            down: true,
        })
    }

    // ── Start barrier ─────────────────────────────────────────────────────────

    #[test]
    fn test_childless_root_start_completes_without_blocking() {
        let registry = MockRegistry::new(vec![1]);
        let calls = registry.handle();
        let mut coordinator = make_root(registry);

        coordinator.process_event(&Event::Start);

        assert_eq!(coordinator.phase(), Phase::Running);
        assert_eq!(coordinator.frustum_count(), 1);
        assert_eq!(*calls.lock().unwrap(), vec![RegistryCall::Start]);
    }

    #[test]
    fn test_start_barrier_completes_with_acks_in_any_order() {
        for flip in [false, true] {
            let registry = MockRegistry::new(vec![1]);
            let mut coordinator = make_root(registry);

            let (to_first, mut first) = loopback_pair("first", "root");
            let (to_second, mut second) = loopback_pair("second", "root");
            coordinator.adopt(to_first);
            coordinator.adopt(to_second);

            // Queue the acks before the barrier runs, in both orders.
            if flip {
                second.send_ack().expect("ack");
                first.send_ack().expect("ack");
            } else {
                first.send_ack().expect("ack");
                second.send_ack().expect("ack");
            }

            coordinator.process_event(&Event::Start);

            assert_eq!(coordinator.phase(), Phase::Running);
            assert_eq!(coordinator.child_count(), 2);
            assert_eq!(first.recv_event().expect("fan-out"), Event::Start);
            assert_eq!(second.recv_event().expect("fan-out"), Event::Start);
        }
    }

    // ── Fan-out ordering ──────────────────────────────────────────────────────

    #[test]
    fn test_fan_out_precedes_local_dispatch() {
        let mut registry = MockRegistry::new(vec![1]);
        let (to_child, mut child_end) = loopback_pair("child", "root");

        // Ack for the Start barrier, queued ahead of time.
        child_end.send_ack().expect("start ack");

        // The hook runs at local dispatch time; every frame fanned out so
        // far, including this event's own, must already be in the child's
        // queue.
        registry.on_process = Some(Box::new(move |event| {
            if let Event::User(_) = event {
                let mut last = None;
                while let Some(received) = child_end.try_recv_event() {
                    last = Some(received);
                }
                assert_eq!(
                    last.as_ref(),
                    Some(event),
                    "fan-out must happen before local dispatch"
                );
            }
            false
        }));

        let mut coordinator = make_root(registry);
        coordinator.adopt(to_child);
        coordinator.process_event(&Event::Start);
        coordinator.process_event(&Event::User(99));
        assert_eq!(coordinator.child_count(), 1);
    }

    // ── Draw pass ─────────────────────────────────────────────────────────────

    #[test]
    fn test_draw_pass_walks_the_frustum_cursor() {
        let registry = MockRegistry::new(vec![2, 1]);
        let calls = registry.handle();
        let mut coordinator = make_root(registry);

        coordinator.process_event(&Event::Start);
        coordinator.process_event(&Event::Draw);

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                RegistryCall::Start,
                RegistryCall::Prep,
                RegistryCall::Draw {
                    display: 0,
                    frustum: 0
                },
                RegistryCall::Draw {
                    display: 1,
                    frustum: 2
                },
            ]
        );
    }

    #[test]
    fn test_calibration_mode_draws_the_test_pattern() {
        let registry = MockRegistry::new(vec![1, 1]);
        let calls = registry.handle();
        let mut coordinator = make_root(registry);

        coordinator.process_event(&Event::Start);
        coordinator.process_event(&make_chord(crate::application::calibration::KEY_TAB));
        coordinator.process_event(&Event::Draw);

        let recorded = calls.lock().unwrap();
        // The chord was consumed by calibration, never offered to the
        // registry.
        assert!(!recorded
            .iter()
            .any(|c| matches!(c, RegistryCall::ProcessEvent(_))));
        assert!(recorded.contains(&RegistryCall::Test {
            display: 0,
            index: 0
        }));
        assert!(recorded.contains(&RegistryCall::Test {
            display: 1,
            index: 0
        }));
    }

    // ── Swap semantics ────────────────────────────────────────────────────────

    #[test]
    fn test_standalone_swap_presents_without_flush() {
        let registry = MockRegistry::new(vec![1]);
        let calls = registry.handle();
        let mut coordinator = make_root(registry);

        coordinator.process_event(&Event::Start);
        coordinator.process_event(&Event::Swap);

        let recorded = calls.lock().unwrap();
        assert!(!recorded.contains(&RegistryCall::Flush));
        assert_eq!(recorded.last(), Some(&RegistryCall::Present));
        assert_eq!(coordinator.frames(), 1);
    }

    #[test]
    fn test_clustered_swap_flushes_before_presenting() {
        let registry = MockRegistry::new(vec![1]);
        let calls = registry.handle();
        let mut coordinator = make_root(registry);

        let (to_child, mut remote) = loopback_pair("child", "root");
        coordinator.adopt(to_child);
        remote.send_ack().expect("start ack");

        coordinator.process_event(&Event::Start);
        coordinator.process_event(&Event::Swap);

        let recorded = calls.lock().unwrap();
        let flush = recorded
            .iter()
            .position(|c| *c == RegistryCall::Flush)
            .expect("flush must run");
        let present = recorded
            .iter()
            .position(|c| *c == RegistryCall::Present)
            .expect("present must run");
        assert!(flush < present);
    }

    #[test]
    fn test_events_before_start_are_not_offered() {
        let registry = MockRegistry::new(vec![1]);
        let calls = registry.handle();
        let mut coordinator = make_root(registry);

        coordinator.process_event(&Event::User(5));
        coordinator.process_event(&Event::Swap);

        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(coordinator.frames(), 0);
    }

    // ── Close ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_close_tears_down_children_after_the_barrier() {
        let registry = MockRegistry::new(vec![1]);
        let calls = registry.handle();
        let mut coordinator = make_root(registry);

        let (to_child, child_end) = loopback_pair("child", "root");
        coordinator.adopt(to_child);

        let child = std::thread::spawn(move || {
            let mut link = child_end;
            assert_eq!(link.recv_event().expect("start"), Event::Start);
            link.send_ack().expect("start ack");
            assert_eq!(link.recv_event().expect("close"), Event::Close);
            link.send_ack().expect("close ack");
        });

        coordinator.process_event(&Event::Start);
        coordinator.process_event(&Event::Close);
        child.join().expect("child thread");

        assert_eq!(coordinator.phase(), Phase::Closed);
        assert_eq!(coordinator.child_count(), 0);
        assert_eq!(calls.lock().unwrap().last(), Some(&RegistryCall::Stop));
    }

    // ── Degradation ───────────────────────────────────────────────────────────

    #[test]
    fn test_send_failure_drops_the_child_and_continues() {
        let registry = MockRegistry::new(vec![1]);
        let calls = registry.handle();
        let mut coordinator = make_root(registry);

        let (to_child, mut child_end) = loopback_pair("child", "root");
        coordinator.adopt(to_child);
        child_end.send_ack().expect("start ack");
        coordinator.process_event(&Event::Start);
        drop(child_end);

        coordinator.process_event(&Event::User(1));

        assert_eq!(coordinator.child_count(), 0);
        assert_eq!(
            calls.lock().unwrap().last(),
            Some(&RegistryCall::ProcessEvent(Event::User(1)))
        );
    }

    #[test]
    fn test_silent_child_times_out_of_the_barrier() {
        let registry = MockRegistry::new(vec![1]);
        let mut coordinator = Coordinator::new(
            registry,
            None,
            CoordinatorOptions {
                bench: true,
                sync_timeout: Some(Duration::from_millis(30)),
                ..CoordinatorOptions::default()
            },
        );

        let (to_child, _silent) = loopback_pair("child", "root");
        coordinator.adopt(to_child);

        // The silent child never acks; the timeout drops it instead of
        // hanging the barrier.
        coordinator.process_event(&Event::Start);

        assert_eq!(coordinator.phase(), Phase::Running);
        assert_eq!(coordinator.child_count(), 0);
    }

    #[test]
    fn test_run_node_synthesizes_close_when_the_parent_dies() {
        let registry = MockRegistry::new(vec![1]);
        let calls = registry.handle();
        let (to_parent, mut parent_end) = loopback_pair("parent", "node");
        let mut coordinator = Coordinator::new(registry, Some(to_parent), make_options());

        let node = std::thread::spawn(move || {
            let result = coordinator.run_node();
            (result, coordinator)
        });

        parent_end
            .send_frame(&encode_event(&Event::Start))
            .expect("send start");
        // The ack is the rendezvous: once it arrives, the node has finished
        // Start and is back at its receive loop.
        parent_end.recv_ack(None).expect("start ack");
        drop(parent_end);

        let (result, coordinator) = node.join().expect("node thread");
        assert!(matches!(result, Err(TransportError::Closed { .. })));
        assert_eq!(coordinator.phase(), Phase::Closed);
        assert_eq!(calls.lock().unwrap().last(), Some(&RegistryCall::Stop));
    }

    /// The parent can also die inside the barrier: `Start` is delivered,
    /// but the link is gone before the ack can be written back.  The node
    /// must tear down exactly as it does for a dead receive, not report a
    /// clean exit with the registry still running.
    #[test]
    fn test_run_node_closes_when_the_parent_dies_at_the_barrier() {
        let registry = MockRegistry::new(vec![1]);
        let calls = registry.handle();
        let (to_parent, mut parent_end) = loopback_pair("parent", "node");
        let mut coordinator = Coordinator::new(registry, Some(to_parent), make_options());

        // Deliver Start, then vanish before reading the ack it triggers.
        parent_end
            .send_frame(&encode_event(&Event::Start))
            .expect("send start");
        drop(parent_end);

        let result = coordinator.run_node();

        assert!(matches!(result, Err(TransportError::Closed { .. })));
        assert_eq!(coordinator.phase(), Phase::Closed);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![RegistryCall::Start, RegistryCall::Stop]
        );
    }

    // ── Admission ─────────────────────────────────────────────────────────────

    #[test]
    fn test_adopt_after_census_is_rejected() {
        let registry = MockRegistry::new(vec![1]);
        let mut coordinator = make_root(registry);
        coordinator.process_event(&Event::Start);

        let (to_child, _remote) = loopback_pair("late", "root");
        coordinator.adopt(to_child);

        assert_eq!(coordinator.child_count(), 0);
    }

    #[test]
    fn test_poll_admission_rejects_late_joiners() {
        let registry = MockRegistry::new(vec![1]);
        let mut coordinator = make_root(registry);
        coordinator.process_event(&Event::Start);

        let (tx, mut hub) = loopback_hub("hub");
        let (inbound, mut remote) = loopback_pair("late", "root");
        tx.send(inbound).expect("queue joiner");

        coordinator.poll_admission(&mut hub);

        assert_eq!(coordinator.child_count(), 0);
        // The rejected link was dropped, so the remote end sees a closed
        // channel.
        assert!(matches!(
            remote.recv_event(),
            Err(TransportError::Closed { .. })
        ));
    }

    #[test]
    fn test_await_children_collects_the_census() {
        let registry = MockRegistry::new(vec![1]);
        let mut coordinator = make_root(registry);

        let (tx, mut hub) = loopback_hub("hub");
        let (first, _keep_first) = loopback_pair("first", "root");
        let (second, _keep_second) = loopback_pair("second", "root");
        tx.send(first).expect("queue first");
        tx.send(second).expect("queue second");

        coordinator
            .await_children(&mut hub, 2)
            .expect("census must complete");
        assert_eq!(coordinator.child_count(), 2);
    }

    // ── Root loop ─────────────────────────────────────────────────────────────

    #[test]
    fn test_run_root_bench_renders_one_tick_per_frame() {
        let registry = MockRegistry::new(vec![1]);
        let calls = registry.handle();
        let mut coordinator = make_root(registry);
        let (_tx, mut hub) = loopback_hub("hub");

        coordinator.run_root(&mut IdleSource, &mut hub, Some(3));

        assert_eq!(coordinator.phase(), Phase::Closed);
        assert_eq!(coordinator.frames(), 3);

        let recorded = calls.lock().unwrap();
        assert_eq!(recorded.first(), Some(&RegistryCall::Start));
        assert_eq!(recorded.last(), Some(&RegistryCall::Stop));
        let ticks = recorded
            .iter()
            .filter(|c| matches!(c, RegistryCall::ProcessEvent(Event::Tick(_))))
            .count();
        let presents = recorded
            .iter()
            .filter(|c| **c == RegistryCall::Present)
            .count();
        assert_eq!(ticks, 3);
        assert_eq!(presents, 3);
        // A standalone root never flushes.
        assert!(!recorded.contains(&RegistryCall::Flush));
    }

    #[test]
    fn test_run_root_stops_on_scripted_close() {
        use crate::infrastructure::input::script::{Script, ScriptStep, ScriptedSource};

        let registry = MockRegistry::new(vec![1]);
        let mut coordinator = make_root(registry);
        let (_tx, mut hub) = loopback_hub("hub");

        let script = Script {
            events: vec![
                ScriptStep::User { frame: 0, value: 7 },
                ScriptStep::Close { frame: 2 },
            ],
        };
        let mut input = ScriptedSource::from_script(script);

        coordinator.run_root(&mut input, &mut hub, None);

        assert_eq!(coordinator.phase(), Phase::Closed);
        assert_eq!(coordinator.frames(), 2);
        assert_eq!(input.remaining(), 0);
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    #[test]
    fn test_geometry_accessors_expose_the_node_record() {
        let options = CoordinatorOptions {
            bench: true,
            sync_timeout: None,
            window: WindowConfig {
                width: 640,
                height: 480,
                ..WindowConfig::default()
            },
            buffer: BufferConfig {
                width: 2048,
                height: 2048,
            },
        };
        let mut registry = MockRegistry::new(vec![1]);
        registry.overlay = Some(4);
        let coordinator: Coordinator<LoopbackLink, _> =
            Coordinator::new(registry, None, options);

        assert!(coordinator.is_root());
        assert_eq!(coordinator.window().width, 640);
        assert_eq!(coordinator.buffer().width, 2048);
        assert_eq!(coordinator.overlay_frustum(), Some(4));
    }
}
