//! Decoder that replays a fixed sequence of results.

use super::{DecodedSymbol, Decoder, DecoderInitError, RawDecodeResult, SymbolFormat};
use crate::capture::Frame;
use std::collections::VecDeque;

/// Replays scripted results, one per decoded frame.
///
/// Once the script runs out every further frame decodes as not found.
/// A second look at the same frame (as a polarity retry does) misses
/// without advancing the script. Useful for demos and for driving the
/// pipeline without real optics.
#[derive(Debug, Default)]
pub struct ScriptedDecoder {
    script: VecDeque<RawDecodeResult>,
    init_failure: Option<String>,
    last_sequence: Option<u64>,
    calls: u64,
}

impl ScriptedDecoder {
    pub fn new(script: impl IntoIterator<Item = RawDecodeResult>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    /// `misses` frames with nothing found, then each text in turn.
    pub fn after_misses<S: Into<String>>(misses: usize, texts: impl IntoIterator<Item = S>) -> Self {
        let found = texts
            .into_iter()
            .map(|t| RawDecodeResult::Found(DecodedSymbol::new(t, SymbolFormat::Unknown)));
        Self::new(std::iter::repeat(RawDecodeResult::NotFound).take(misses).chain(found))
    }

    /// Makes `init` fail with `reason`.
    pub fn failing_init(mut self, reason: impl Into<String>) -> Self {
        self.init_failure = Some(reason.into());
        self
    }

    /// Number of decode calls so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Scripted results not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Decoder for ScriptedDecoder {
    fn name(&self) -> &str {
        "scripted"
    }

    fn init(&mut self) -> Result<(), DecoderInitError> {
        // A new stream numbers its frames from the start again.
        self.last_sequence = None;
        match &self.init_failure {
            Some(reason) => Err(DecoderInitError::new(self.name(), reason.clone())),
            None => Ok(()),
        }
    }

    fn decode(&mut self, frame: &Frame) -> RawDecodeResult {
        self.calls += 1;
        if self.last_sequence.replace(frame.sequence()) == Some(frame.sequence()) {
            return RawDecodeResult::NotFound;
        }
        self.script.pop_front().unwrap_or(RawDecodeResult::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_then_misses() {
        let mut decoder = ScriptedDecoder::after_misses(2, ["12345678"]);
        let frame = |seq| Frame::new(vec![0; 4], 2, 2, seq);

        assert_eq!(decoder.decode(&frame(1)), RawDecodeResult::NotFound);
        assert_eq!(decoder.decode(&frame(2)), RawDecodeResult::NotFound);
        assert_eq!(
            decoder.decode(&frame(3)).symbol().map(|s| s.text.as_str()),
            Some("12345678")
        );
        assert_eq!(decoder.decode(&frame(4)), RawDecodeResult::NotFound);
        assert_eq!(decoder.calls(), 4);
    }

    #[test]
    fn test_same_frame_does_not_advance() {
        let mut decoder = ScriptedDecoder::after_misses(1, ["12345678"]);
        let first = Frame::new(vec![0; 4], 2, 2, 1);

        assert_eq!(decoder.decode(&first), RawDecodeResult::NotFound);
        assert_eq!(decoder.decode(&first.inverted()), RawDecodeResult::NotFound);
        assert_eq!(decoder.remaining(), 1);
        assert!(decoder.decode(&Frame::new(vec![0; 4], 2, 2, 2)).is_found());
    }

    #[test]
    fn test_init_forgets_previous_stream() {
        let mut decoder = ScriptedDecoder::after_misses(0, ["12345678", "87654321"]);
        let frame = Frame::new(vec![0; 4], 2, 2, 1);

        decoder.init().unwrap();
        assert!(decoder.decode(&frame).is_found());

        decoder.init().unwrap();
        assert_eq!(
            decoder.decode(&frame).symbol().map(|s| s.text.as_str()),
            Some("87654321")
        );
    }

    #[test]
    fn test_failing_init() {
        let mut decoder = ScriptedDecoder::default().failing_init("no wasm");
        let err = decoder.init().unwrap_err();
        assert_eq!(err.decoder, "scripted");
        assert!(err.to_string().contains("no wasm"));
    }
}
