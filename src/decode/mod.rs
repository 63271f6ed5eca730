//! Decoder capability contract.
//!
//! Locating and reading symbols in pixel data is delegated to a pluggable
//! decoder. The scan loop only relies on the contract below: decoding
//! reads the frame without modifying it, gives the same answer for the
//! same pixels, and returns within its own time bound.

mod polarity;
#[cfg(feature = "decoder")]
mod rxing_reader;
mod scripted;

pub use polarity::PolarityFallback;
#[cfg(feature = "decoder")]
pub use rxing_reader::RxingDecoder;
pub use scripted::ScriptedDecoder;

use crate::capture::Frame;
use serde::Serialize;
use thiserror::Error;

/// Symbologies a decoder may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolFormat {
    Ean13,
    Ean8,
    UpcA,
    Code128,
    Code39,
    QrCode,
    Unknown,
}

/// Which pixel polarity produced a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Dark bars on a light background.
    #[default]
    Normal,
    /// Light bars on a dark background.
    Inverted,
}

/// A symbol read from one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedSymbol {
    pub text: String,
    pub format: SymbolFormat,
    pub polarity: Polarity,
}

impl DecodedSymbol {
    pub fn new(text: impl Into<String>, format: SymbolFormat) -> Self {
        Self {
            text: text.into(),
            format,
            polarity: Polarity::Normal,
        }
    }
}

/// Decoder output for a single frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawDecodeResult {
    NotFound,
    Found(DecodedSymbol),
}

impl RawDecodeResult {
    pub fn is_found(&self) -> bool {
        matches!(self, RawDecodeResult::Found(_))
    }

    pub fn symbol(&self) -> Option<&DecodedSymbol> {
        match self {
            RawDecodeResult::Found(symbol) => Some(symbol),
            RawDecodeResult::NotFound => None,
        }
    }
}

/// The decoder could not be brought up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("decoder '{decoder}' failed to initialize: {reason}")]
pub struct DecoderInitError {
    pub decoder: String,
    pub reason: String,
}

impl DecoderInitError {
    pub fn new(decoder: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            decoder: decoder.into(),
            reason: reason.into(),
        }
    }
}

/// Trait for barcode decoder implementations.
pub trait Decoder {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Prepares the decoder. Called once per scan attempt before the
    /// camera is acquired.
    fn init(&mut self) -> Result<(), DecoderInitError> {
        Ok(())
    }

    /// Attempts to read one symbol from `frame`.
    fn decode(&mut self, frame: &Frame) -> RawDecodeResult;
}

impl<D: Decoder + ?Sized> Decoder for Box<D> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn init(&mut self) -> Result<(), DecoderInitError> {
        (**self).init()
    }

    fn decode(&mut self, frame: &Frame) -> RawDecodeResult {
        (**self).decode(frame)
    }
}
