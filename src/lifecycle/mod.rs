//! Scan attempt lifecycle.
//!
//! ```text
//! Idle → Initializing → Acquiring → Scanning → Succeeded
//!             ↓             ↓           ↓
//!           Failed        Failed    Cancelled / Failed
//! ```
//!
//! A terminal state releases the camera before any observer callback
//! runs. Manual entry can resolve an attempt from any active state.

mod controller;
mod observer;
mod state;

pub use controller::{LifecycleController, ScanOutcome};
pub use observer::{ChannelObserver, ScanEvent, ScanObserver, TracingObserver};
pub use state::{ManualEntryError, ScanFailure, ScanState};
