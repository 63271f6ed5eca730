//! Frame scanning.
//!
//! A cooperative loop that pulls one frame per tick from the live camera
//! session, runs one decode on it and hands the raw result on. Scheduling
//! is single-threaded: pacing comes from a [`TickSource`] and cancellation
//! is polled between decodes, never preemptively.

mod frame_loop;
mod throttle;
mod tick;

pub use frame_loop::{FrameScanLoop, LoopStats, Tick};
pub use throttle::CandidateThrottle;
pub use tick::{CancelToken, FixedRateTicker, TickSource};
