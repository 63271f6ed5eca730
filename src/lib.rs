//! Product Scanner Library
//!
//! Turns a live camera feed into a validated retail product code, with
//! manual entry as a fallback whenever the camera path fails.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! capture → scan loop → decode → validation → lookup
//!     ↑                              ↓
//!     └──────── lifecycle (state machine, release) ──┘
//! ```
//!
//! # Design Principles
//!
//! - **Release first**: every terminal state stops the camera before observers run
//! - **Ordered fallback**: capture constraints are tried strictly in order
//! - **Pluggable decoding**: pixels are read behind the `Decoder` trait; the `rxing` reader is optional (feature `decoder`)
//! - **Manual entry always available**: typed codes pass the same validator
//!
//! # Example
//!
//! ```no_run
//! use product_scanner::{
//!     capture::{MockBackend, ScannerConfig},
//!     decode::ScriptedDecoder,
//!     lifecycle::{LifecycleController, ScanOutcome, TracingObserver},
//!     scan::{CancelToken, FixedRateTicker},
//! };
//!
//! let config = ScannerConfig::default();
//! let decoder = ScriptedDecoder::after_misses(3, ["5901234123457"]);
//! let mut controller =
//!     LifecycleController::new(MockBackend::new(), decoder, TracingObserver, &config);
//!
//! controller.start_scan();
//! let mut ticks = FixedRateTicker::new(config.scan.tick_interval());
//! if let Some(ScanOutcome::Resolved(code)) = controller.run(&mut ticks, &CancelToken::new()) {
//!     println!("{}", code.code);
//! }
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod decode;
pub mod lifecycle;
pub mod lookup;
pub mod metrics;
pub mod scan;
pub mod validation;

// Re-export commonly used types at crate root
pub use capture::{CameraBackend, CameraSessionManager, CaptureConstraint, Frame, ScannerConfig};
pub use decode::{Decoder, RawDecodeResult};
pub use lifecycle::{LifecycleController, ScanObserver, ScanOutcome, ScanState};
pub use lookup::{LookupOutcome, ProductLookup, ProductRecord};
pub use metrics::ScanMetrics;
pub use scan::{CancelToken, FrameScanLoop};
pub use validation::{CodeValidator, ValidatedCode};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
