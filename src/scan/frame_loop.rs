//! The per-tick sample → decode → forward loop.

use super::throttle::CandidateThrottle;
use super::tick::TickSource;
use crate::capture::{CameraSession, FrameError, ScanConfig};
use crate::decode::{Decoder, RawDecodeResult};
use std::ops::ControlFlow;
use std::time::{Duration, Instant};

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick<B> {
    /// Cancellation was observed; nothing further is forwarded.
    Cancelled,
    /// The camera session has been released.
    Inactive,
    /// The stream has no frame yet.
    WarmingUp,
    /// A frame could not be sampled; the next tick retries.
    FrameDropped,
    /// A repeat of the last symbol arrived inside the throttle window and
    /// was discarded.
    Throttled,
    /// The result was forwarded and the consumer wants more.
    Continue,
    /// The consumer stopped the loop with a value.
    Break(B),
}

/// Counters for one scan attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub warmup_ticks: u64,
    pub frames_decoded: u64,
    pub frames_dropped: u64,
    pub throttled: u64,
    pub slow_decodes: u64,
}

/// Cooperative frame scan loop.
///
/// Each tick samples at most one frame and runs exactly one decode on
/// it, so results reach the consumer strictly in sampling order and
/// never overlap.
#[derive(Debug)]
pub struct FrameScanLoop {
    throttle: CandidateThrottle,
    decode_budget: Duration,
    stats: LoopStats,
}

impl Default for FrameScanLoop {
    fn default() -> Self {
        Self::new(&ScanConfig::default())
    }
}

impl FrameScanLoop {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            throttle: CandidateThrottle::new(config.candidate_throttle()),
            decode_budget: config.decode_budget(),
            stats: LoopStats::default(),
        }
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Runs one tick.
    ///
    /// Cancellation is checked before sampling and again once the decode
    /// returns; a decode already running always completes, but its result
    /// is not forwarded after cancellation.
    pub fn tick<D, C, F, B>(
        &mut self,
        session: &mut CameraSession,
        decoder: &mut D,
        is_cancelled: C,
        mut on_candidate: F,
    ) -> Tick<B>
    where
        D: Decoder + ?Sized,
        C: Fn() -> bool,
        F: FnMut(RawDecodeResult) -> ControlFlow<B>,
    {
        if is_cancelled() {
            return Tick::Cancelled;
        }
        if !session.is_active() {
            return Tick::Inactive;
        }

        self.stats.ticks += 1;
        if !session.frame_ready() {
            self.stats.warmup_ticks += 1;
            tracing::trace!(tick = self.stats.ticks, "Camera warming up");
            return Tick::WarmingUp;
        }

        let frame = match session.grab() {
            Ok(frame) => frame,
            Err(FrameError::NotActive) => return Tick::Inactive,
            Err(err) => {
                self.stats.frames_dropped += 1;
                tracing::warn!(tick = self.stats.ticks, error = %err, "Frame sample failed");
                return Tick::FrameDropped;
            }
        };

        let started = Instant::now();
        let result = decoder.decode(&frame);
        let elapsed = started.elapsed();
        self.stats.frames_decoded += 1;

        if elapsed > self.decode_budget {
            self.stats.slow_decodes += 1;
            tracing::warn!(
                decoder = decoder.name(),
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = self.decode_budget.as_millis() as u64,
                "Decode exceeded its time budget"
            );
        }
        tracing::trace!(
            tick = self.stats.ticks,
            sequence = frame.sequence(),
            found = result.is_found(),
            "Frame decoded"
        );
        drop(frame);

        if is_cancelled() {
            return Tick::Cancelled;
        }
        if let Some(symbol) = result.symbol() {
            if !self.throttle.admit(&symbol.text, Instant::now()) {
                self.stats.throttled += 1;
                return Tick::Throttled;
            }
        }

        match on_candidate(result) {
            ControlFlow::Break(value) => Tick::Break(value),
            ControlFlow::Continue(()) => Tick::Continue,
        }
    }

    /// Ticks until the consumer breaks, cancellation is observed or the
    /// session goes inactive, waiting on `ticks` in between.
    pub fn run<D, C, F, B>(
        &mut self,
        session: &mut CameraSession,
        decoder: &mut D,
        ticks: &mut dyn TickSource,
        is_cancelled: C,
        mut on_candidate: F,
    ) -> Option<B>
    where
        D: Decoder + ?Sized,
        C: Fn() -> bool,
        F: FnMut(RawDecodeResult) -> ControlFlow<B>,
    {
        loop {
            match self.tick(session, decoder, &is_cancelled, &mut on_candidate) {
                Tick::Break(value) => return Some(value),
                Tick::Cancelled | Tick::Inactive => return None,
                Tick::WarmingUp
                | Tick::FrameDropped
                | Tick::Throttled
                | Tick::Continue => ticks.wait_next(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CameraSessionManager, CaptureConstraint, FacingMode, Frame, MockBackend};
    use crate::decode::{DecodedSymbol, ScriptedDecoder, SymbolFormat};
    use crate::scan::CancelToken;
    use std::cell::Cell;

    struct NoWait;

    impl TickSource for NoWait {
        fn wait_next(&mut self) {}
    }

    fn manager(backend: MockBackend) -> CameraSessionManager<MockBackend> {
        let mut manager = CameraSessionManager::new(backend);
        manager
            .acquire(&[CaptureConstraint::facing(FacingMode::Any)])
            .unwrap();
        manager
    }

    fn unthrottled() -> FrameScanLoop {
        FrameScanLoop::new(&ScanConfig {
            candidate_throttle_ms: 0,
            ..ScanConfig::default()
        })
    }

    #[test]
    fn test_warmup_skips_decode() {
        let mut manager = manager(MockBackend::new().with_warmup(2));
        let session = manager.session_mut().unwrap();
        let mut decoder = ScriptedDecoder::default();
        let mut scan = unthrottled();

        let forward = |_: RawDecodeResult| ControlFlow::<()>::Continue(());
        assert_eq!(scan.tick(session, &mut decoder, || false, forward), Tick::WarmingUp);
        assert_eq!(scan.tick(session, &mut decoder, || false, forward), Tick::WarmingUp);
        assert_eq!(scan.tick(session, &mut decoder, || false, forward), Tick::Continue);
        assert_eq!(decoder.calls(), 1);
        assert_eq!(scan.stats().warmup_ticks, 2);
    }

    #[test]
    fn test_misses_are_forwarded_in_order() {
        let mut manager = manager(MockBackend::new());
        let session = manager.session_mut().unwrap();
        let mut decoder = ScriptedDecoder::after_misses(3, ["A", "B"]);
        let mut scan = unthrottled();
        let mut seen = Vec::new();

        let stopped = scan.run(session, &mut decoder, &mut NoWait, || false, |raw| {
            seen.push(raw.symbol().map(|s| s.text.clone()));
            if seen.len() == 5 {
                ControlFlow::Break(seen.len())
            } else {
                ControlFlow::Continue(())
            }
        });

        assert_eq!(stopped, Some(5));
        assert_eq!(
            seen,
            vec![None, None, None, Some("A".to_string()), Some("B".to_string())]
        );
    }

    #[test]
    fn test_throttle_drops_repeat_candidates() {
        let mut manager = manager(MockBackend::new());
        let session = manager.session_mut().unwrap();
        let mut decoder = ScriptedDecoder::new(vec![
            RawDecodeResult::Found(DecodedSymbol::new("123", SymbolFormat::Code128)),
            RawDecodeResult::Found(DecodedSymbol::new("123", SymbolFormat::Code128)),
        ]);
        let mut scan = FrameScanLoop::new(&ScanConfig {
            candidate_throttle_ms: 10_000,
            ..ScanConfig::default()
        });

        let forward = |_: RawDecodeResult| ControlFlow::<()>::Continue(());
        assert_eq!(scan.tick(session, &mut decoder, || false, forward), Tick::Continue);
        assert_eq!(scan.tick(session, &mut decoder, || false, forward), Tick::Throttled);
        // Misses are never throttled.
        assert_eq!(scan.tick(session, &mut decoder, || false, forward), Tick::Continue);
        assert_eq!(scan.stats().throttled, 1);
    }

    #[test]
    fn test_throttle_passes_a_different_symbol() {
        let mut manager = manager(MockBackend::new());
        let session = manager.session_mut().unwrap();
        let mut decoder = ScriptedDecoder::new(vec![
            RawDecodeResult::Found(DecodedSymbol::new("QR:hello", SymbolFormat::QrCode)),
            RawDecodeResult::Found(DecodedSymbol::new("12345678", SymbolFormat::Ean8)),
        ]);
        let mut scan = FrameScanLoop::new(&ScanConfig {
            candidate_throttle_ms: 10_000,
            ..ScanConfig::default()
        });

        let forward = |_: RawDecodeResult| ControlFlow::<()>::Continue(());
        assert_eq!(scan.tick(session, &mut decoder, || false, forward), Tick::Continue);
        assert_eq!(scan.tick(session, &mut decoder, || false, forward), Tick::Continue);
        assert_eq!(scan.stats().throttled, 0);
    }

    #[test]
    fn test_cancelled_before_tick() {
        let mut manager = manager(MockBackend::new());
        let session = manager.session_mut().unwrap();
        let mut decoder = ScriptedDecoder::default();
        let mut scan = unthrottled();

        let tick = scan.tick(session, &mut decoder, || true, |_| ControlFlow::<()>::Continue(()));
        assert_eq!(tick, Tick::Cancelled);
        assert_eq!(decoder.calls(), 0);
    }

    /// Requests cancellation from inside the decode call.
    struct CancellingDecoder {
        token: CancelToken,
        calls: u32,
    }

    impl Decoder for CancellingDecoder {
        fn name(&self) -> &str {
            "cancelling"
        }

        fn decode(&mut self, _frame: &Frame) -> RawDecodeResult {
            self.calls += 1;
            self.token.cancel();
            RawDecodeResult::Found(DecodedSymbol::new("5901234123457", SymbolFormat::Ean13))
        }
    }

    #[test]
    fn test_in_flight_decode_completes_but_is_not_forwarded() {
        let mut manager = manager(MockBackend::new());
        let session = manager.session_mut().unwrap();
        let token = CancelToken::new();
        let mut decoder = CancellingDecoder {
            token: token.clone(),
            calls: 0,
        };
        let mut scan = unthrottled();
        let forwarded = Cell::new(0);

        let result = scan.run(
            session,
            &mut decoder,
            &mut NoWait,
            || token.is_cancelled(),
            |_| {
                forwarded.set(forwarded.get() + 1);
                ControlFlow::<()>::Continue(())
            },
        );

        assert_eq!(result, None);
        assert_eq!(decoder.calls, 1);
        assert_eq!(forwarded.get(), 0);
    }

    #[test]
    fn test_released_session_stops_loop() {
        let mut manager = manager(MockBackend::new());
        let probe = manager.backend().probe();
        let session = manager.session_mut().unwrap();
        let mut decoder = ScriptedDecoder::default();
        let mut scan = unthrottled();

        session.release();
        let stopped = scan.run(session, &mut decoder, &mut NoWait, || false, |_| {
            ControlFlow::<()>::Continue(())
        });

        assert_eq!(stopped, None);
        assert_eq!(decoder.calls(), 0);
        assert_eq!(probe.stop_calls(), 1);
    }
}
