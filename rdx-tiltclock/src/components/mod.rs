//! The four feature modules shown on the panels.
//!
//! Each one exposes a narrow start/pause/reset/query contract and owns its
//! own scheduler handle. The dispatcher composes them; they never reach
//! into each other.

pub mod alarm;
pub mod stopwatch;
pub mod timer;
pub mod weather;
