//! Inverted-polarity retry.

use super::{Decoder, DecoderInitError, Polarity, RawDecodeResult};
use crate::capture::Frame;

/// Retries a missed frame with inverted pixels.
///
/// Light-on-dark labels only read once the luminance is flipped. The
/// inversion works on a copy, so the sampled frame is never modified.
#[derive(Debug)]
pub struct PolarityFallback<D> {
    inner: D,
}

impl<D: Decoder> PolarityFallback<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<D: Decoder> Decoder for PolarityFallback<D> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn init(&mut self) -> Result<(), DecoderInitError> {
        self.inner.init()
    }

    fn decode(&mut self, frame: &Frame) -> RawDecodeResult {
        if let found @ RawDecodeResult::Found(_) = self.inner.decode(frame) {
            return found;
        }

        match self.inner.decode(&frame.inverted()) {
            RawDecodeResult::Found(mut symbol) => {
                symbol.polarity = Polarity::Inverted;
                tracing::trace!(sequence = frame.sequence(), "Symbol read on inverted frame");
                RawDecodeResult::Found(symbol)
            }
            RawDecodeResult::NotFound => RawDecodeResult::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{DecodedSymbol, SymbolFormat};

    /// Reads a symbol only when the first pixel is bright.
    struct BrightCorner;

    impl Decoder for BrightCorner {
        fn name(&self) -> &str {
            "bright-corner"
        }

        fn decode(&mut self, frame: &Frame) -> RawDecodeResult {
            match frame.pixels().first() {
                Some(&v) if v > 200 => {
                    RawDecodeResult::Found(DecodedSymbol::new("96385074", SymbolFormat::Ean8))
                }
                _ => RawDecodeResult::NotFound,
            }
        }
    }

    #[test]
    fn test_normal_read_skips_inversion() {
        let mut decoder = PolarityFallback::new(BrightCorner);
        let frame = Frame::new(vec![255; 4], 2, 2, 1);

        let symbol = decoder.decode(&frame).symbol().cloned().unwrap();
        assert_eq!(symbol.polarity, Polarity::Normal);
    }

    #[test]
    fn test_inverted_read_is_tagged() {
        let mut decoder = PolarityFallback::new(BrightCorner);
        let frame = Frame::new(vec![0; 4], 2, 2, 1);

        let symbol = decoder.decode(&frame).symbol().cloned().unwrap();
        assert_eq!(symbol.polarity, Polarity::Inverted);
        assert_eq!(frame.pixels(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_miss_on_both_polarities() {
        let mut decoder = PolarityFallback::new(BrightCorner);
        let frame = Frame::new(vec![128; 4], 2, 2, 1);
        assert_eq!(decoder.decode(&frame), RawDecodeResult::NotFound);
    }
}
