//! Barcode text validation.
//!
//! Decoded text is reduced to its digits and accepted only when the digit
//! count matches EAN-13, EAN-8 or UPC-A. GS1 prefix and check-digit
//! information is attached for display and never changes the verdict.

pub mod gs1;
mod validator;

pub use validator::{BarcodeFormat, CodeValidator, ValidatedCode};
