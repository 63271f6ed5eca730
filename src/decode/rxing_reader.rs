//! Pixel decoding with `rxing`, restricted to retail linear symbologies.

use super::{DecodedSymbol, Decoder, RawDecodeResult, SymbolFormat};
use crate::capture::Frame;
use rxing::helpers::detect_in_luma_with_hints;
use rxing::{BarcodeFormat, DecodeHintType, DecodeHintValue, DecodingHintDictionary};
use std::collections::HashSet;

/// Symbologies the reader is allowed to report.
const RETAIL_FORMATS: [BarcodeFormat; 5] = [
    BarcodeFormat::EAN_13,
    BarcodeFormat::EAN_8,
    BarcodeFormat::UPC_A,
    BarcodeFormat::CODE_128,
    BarcodeFormat::CODE_39,
];

/// Reads EAN-13, EAN-8, UPC-A, Code 128 and Code 39 from a frame's luma plane.
pub struct RxingDecoder {
    hints: DecodingHintDictionary,
}

impl std::fmt::Debug for RxingDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RxingDecoder")
            .field("formats", &RETAIL_FORMATS.len())
            .finish()
    }
}

impl Default for RxingDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RxingDecoder {
    pub fn new() -> Self {
        let mut hints = DecodingHintDictionary::new();
        hints.insert(
            DecodeHintType::POSSIBLE_FORMATS,
            DecodeHintValue::PossibleFormats(RETAIL_FORMATS.iter().cloned().collect::<HashSet<_>>()),
        );
        hints.insert(DecodeHintType::TRY_HARDER, DecodeHintValue::TryHarder(true));
        Self { hints }
    }
}

fn symbol_format(format: &BarcodeFormat) -> SymbolFormat {
    match format {
        BarcodeFormat::EAN_13 => SymbolFormat::Ean13,
        BarcodeFormat::EAN_8 => SymbolFormat::Ean8,
        BarcodeFormat::UPC_A => SymbolFormat::UpcA,
        BarcodeFormat::CODE_128 => SymbolFormat::Code128,
        BarcodeFormat::CODE_39 => SymbolFormat::Code39,
        _ => SymbolFormat::Unknown,
    }
}

impl Decoder for RxingDecoder {
    fn name(&self) -> &str {
        "rxing"
    }

    fn decode(&mut self, frame: &Frame) -> RawDecodeResult {
        if !frame.is_valid() {
            return RawDecodeResult::NotFound;
        }

        match detect_in_luma_with_hints(
            frame.luma(),
            frame.width(),
            frame.height(),
            None,
            &mut self.hints,
        ) {
            Ok(result) => RawDecodeResult::Found(DecodedSymbol::new(
                result.getText(),
                symbol_format(result.getBarcodeFormat()),
            )),
            Err(e) => {
                tracing::trace!(sequence = frame.sequence(), error = %e, "No symbol in frame");
                RawDecodeResult::NotFound
            }
        }
    }
}
