//! Domain logic for framelock.
//!
//! This module contains pure logic with no infrastructure dependencies: no OS
//! APIs, no sockets, no rendering.  Everything here can be compiled and
//! tested on any platform without external setup, which is exactly why the
//! clock lives here rather than next to the socket code that uses it.

/// The frame clock — converts elapsed time into fixed-size ticks.
///
/// See [`clock::FrameClock`] for the main type.
pub mod clock;
