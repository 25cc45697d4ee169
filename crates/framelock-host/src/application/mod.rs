//! Application layer for the cluster host.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure rules like the frame clock) and the infrastructure (sockets, files,
//! process spawning).
//!
//! The coordinator here:
//!
//! - **Orchestrates** the event flow that keeps every node in lock step:
//!   fan-out to children, local dispatch, barrier sync back up the tree.
//! - **Depends on abstractions** (`EventLink`, `LinkAcceptor`,
//!   `RenderRegistry`, `InputSource`) rather than concrete sockets or GPUs,
//!   so tests can run whole clusters in-process.
//!
//! # Sub-modules
//!
//! - **`coordinator`** – The cluster state machine.  Owns the tree links and
//!   drives every frame; this is the part that runs on every event.
//!
//! - **`calibration`** – Interactive projector-alignment mode, driven by
//!   Ctrl-key chords that travel through the ordered event stream like
//!   everything else.

pub mod calibration;
pub mod coordinator;

pub use coordinator::{Coordinator, CoordinatorOptions, Phase};
