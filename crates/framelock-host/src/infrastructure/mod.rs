//! Infrastructure layer for the cluster coordinator.
//!
//! Contains OS-facing adapters: TCP channel endpoints and listeners,
//! configuration file loading, render-target and input-source seams, and the
//! ssh child launcher.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `framelock_core`, but the application layer only reaches back into it for
//! the seam traits and their error types, never for concrete sockets.

pub mod input;
pub mod launch;
pub mod network;
pub mod registry;
pub mod storage;
