//! Subframe decoding and the streaming orchestrator.
//!
//! The biphase-mark code puts a transition at every cell boundary and an
//! extra mid-cell transition for a `1`:
//!
//! ```text
//!                _   ___     _   _   ___   _     ___   _
//! biphase       | | |   |   | | | | |   | | |   |   | | |
//! mark     ___  | | |   |   | | | | |   | | |   |   | | |
//! signal       _| |_|   |___| |_| |_|   |_| |___|   |_| |___
//!
//! cells          1 0 1 1 0 0 1 0 1 0 1 1 0 1 0 0 1 1 0 1 0 0
//! ```
//!
//! A short pulse therefore signals a `1` (and consumes two edges); anything
//! wider signals a `0` (one edge). [`Decoder`] drives threshold estimation,
//! preamble scanning and subframe decoding on every pushed edge and emits
//! sample and block events through its [`EventSink`].

use log::{debug, trace};

use super::sync::scan_preamble;
use super::threshold::{self, Thresholds};
use super::{BlockEvent, EventSink, SampleEvent};
use crate::log_or_err;
use crate::structs::edge::{EdgeRing, SAMPLE_EDGES};
use crate::structs::frame::{FrameType, Subframe};
use crate::structs::status::{BLOCK_FRAMES, BlockStatus};
use crate::utils::errors::SignalError;

/// Decodes the 28 payload cells that follow a confirmed preamble.
///
/// `cursor` addresses the first preamble edge; the four preamble edges are
/// consumed without inspection. Bits are packed LSB-first into positions
/// 4..32 of the subframe. Returns the cursor past the last consumed edge and
/// the assembled subframe.
pub fn read_subframe(ring: &EdgeRing, cursor: u64, thresholds: &Thresholds) -> (u64, Subframe) {
    let mut cursor = cursor + 4;
    let mut raw = 0u32;

    for bitpos in 4..32 {
        if thresholds.is_short(ring.dt(cursor)) {
            // Mid-cell toggle: a 1, spanning two edges.
            raw |= 1 << bitpos;
            cursor += 2;
        } else {
            cursor += 1;
        }
    }

    (cursor, Subframe(raw))
}

/// Streaming decoder for an edge-timestamped biphase-mark signal.
///
/// Feed edges with [`push_edge`](Self::push_edge); decoded subframes and
/// completed channel-status blocks are delivered synchronously to the
/// [`EventSink`] supplied at construction. The decoder is single-threaded
/// and self-synchronizing: bad signal and lost sync cost a bounded forward
/// skip, never a stall or a stream abort.
///
/// # Example
///
/// ```rust,no_run
/// use spdif::process::decode::Decoder;
///
/// // The unit sink discards events; counters remain available.
/// let mut decoder = Decoder::new(());
/// for &(dt, level) in &[(30u16, true), (30, false), (10, true), (10, false)] {
///     decoder.push_edge(dt, level)?;
/// }
/// println!("{} subframes seen", decoder.syncs());
/// # Ok::<(), spdif::utils::errors::SignalError>(())
/// ```
#[derive(Debug)]
pub struct Decoder<S> {
    ring: EdgeRing,
    reported: Thresholds,

    current: BlockStatus,
    previous: BlockStatus,
    left_bits: usize,
    right_bits: usize,
    left_wrapped: bool,
    right_wrapped: bool,

    n_syncs: u64,
    n_b_syncs: u64,
    last_b_sync: u64,
    last_b_time: u64,
    prev_block_syncs: u64,
    prev_block_ticks: u64,

    overruns: u64,
    in_overrun: bool,
    fail_level: log::Level,

    sink: S,
}

impl<S: EventSink> Decoder<S> {
    pub fn new(sink: S) -> Self {
        Self {
            ring: EdgeRing::default(),
            reported: Thresholds::default(),
            current: BlockStatus::default(),
            previous: BlockStatus::default(),
            left_bits: 0,
            right_bits: 0,
            left_wrapped: false,
            right_wrapped: false,
            n_syncs: 0,
            n_b_syncs: 0,
            last_b_sync: 0,
            last_b_time: 0,
            prev_block_syncs: 0,
            prev_block_ticks: 0,
            overruns: 0,
            in_overrun: false,
            fail_level: log::Level::Error,
            sink,
        }
    }

    /// Sets the failure level for stream anomalies.
    ///
    /// - `log::Level::Error`: anomalies are logged, never fatal (default)
    /// - `log::Level::Warn`: ring overruns become errors (strict mode)
    /// - `log::Level::Debug` and below: recoverable signal faults become
    ///   errors too; mostly useful in tests
    pub fn set_fail_level(&mut self, level: log::Level) {
        self.fail_level = level;
    }

    /// Pushes one level transition into the decoder.
    ///
    /// `dt` is the tick count since the previous transition and must be
    /// non-zero; `level` is the new line level. The source must suppress
    /// duplicate levels. Zero or more sink callbacks fire before this
    /// returns.
    ///
    /// Every call drains before returning, which keeps the unread window
    /// under half the ring's capacity; the ring therefore cannot fill
    /// through this method, and the overrun report stays tied to
    /// [`EdgeRing`]'s drop-oldest contract rather than a reachable steady
    /// state.
    pub fn push_edge(&mut self, dt: u16, level: bool) -> Result<(), SignalError> {
        if self.ring.push(dt, level) {
            self.overruns += 1;
            if !self.in_overrun {
                self.in_overrun = true;
                log_or_err!(
                    self,
                    log::Level::Warn,
                    SignalError::RingOverrun {
                        dropped: self.overruns,
                    },
                );
            }
        } else {
            self.in_overrun = false;
        }

        self.drain()
    }

    /// Subframes decoded so far.
    pub fn syncs(&self) -> u64 {
        self.n_syncs
    }

    /// B preambles seen so far. One less than this many blocks have been
    /// reported, since a block needs both its boundaries confirmed.
    pub fn block_starts(&self) -> u64 {
        self.n_b_syncs
    }

    /// Unread edges dropped to ring overruns.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// The most recently completed block, as delivered with the last block
    /// event.
    pub fn previous_block(&self) -> &BlockStatus {
        &self.previous
    }

    /// Duration in ticks of the most recently completed block. Zero until a
    /// block has completed.
    pub fn previous_block_ticks(&self) -> u64 {
        self.prev_block_ticks
    }

    /// Subframes decoded within the most recently completed block. 384 on a
    /// clean stereo stream.
    pub fn previous_block_syncs(&self) -> u64 {
        self.prev_block_syncs
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Returns the decoder to a fresh state without reallocation. The sink
    /// and fail level are kept.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.reported = Thresholds::default();
        self.current = BlockStatus::default();
        self.previous = BlockStatus::default();
        self.left_bits = 0;
        self.right_bits = 0;
        self.left_wrapped = false;
        self.right_wrapped = false;
        self.n_syncs = 0;
        self.n_b_syncs = 0;
        self.last_b_sync = 0;
        self.last_b_time = 0;
        self.prev_block_syncs = 0;
        self.prev_block_ticks = 0;
        self.overruns = 0;
        self.in_overrun = false;
    }

    /// Runs analysis passes while at least two chunks of unread edges remain.
    fn drain(&mut self) -> Result<(), SignalError> {
        while self.ring.unread() >= (SAMPLE_EDGES as u64) << 1 {
            let rd = self.ring.read_index();

            let Some(thresholds) = threshold::estimate(&self.ring, rd, rd + SAMPLE_EDGES as u64)
            else {
                log_or_err!(
                    self,
                    log::Level::Debug,
                    SignalError::BadSignal { edge: rd },
                );
                self.ring.advance((SAMPLE_EDGES as u64) >> 1);
                continue;
            };

            if thresholds.drifted_from(&self.reported) {
                debug!(
                    "thresholds [{}..{}] -> [{}..{}]",
                    self.reported.t12, self.reported.t23, thresholds.t12, thresholds.t23
                );
                self.reported = thresholds;
            }

            let (scanned, frame_type) = scan_preamble(&self.ring, rd, &thresholds);
            self.ring.advance(scanned);

            if frame_type == FrameType::Invalid {
                log_or_err!(self, log::Level::Trace, SignalError::LostSync { edge: rd });
                self.ring.advance((SAMPLE_EDGES as u64) >> 1);
                continue;
            }

            self.n_syncs += 1;

            if frame_type.is_block_start() {
                self.begin_block();
            }

            let start_index = self.ring.read_index();
            let start = self.ring.at(start_index);
            let (next, subframe) = read_subframe(&self.ring, start_index, &thresholds);
            self.ring.advance(next - start_index);
            let end = self.ring.at(self.ring.read_index());

            self.accumulate(frame_type, subframe)?;

            self.sink.sample(&SampleEvent {
                start,
                end,
                frame_type,
                subframe,
            });
        }

        Ok(())
    }

    /// Handles a B preamble: report the block it closes, then open the next.
    fn begin_block(&mut self) {
        self.n_b_syncs += 1;
        let now = self.ring.at(self.ring.read_index());

        if self.n_b_syncs > 1 {
            self.sink.block(&BlockEvent {
                start: self.last_b_time,
                end: now,
                status: &self.current,
            });

            self.prev_block_syncs = self.n_syncs - self.last_b_sync;
            self.prev_block_ticks = now - self.last_b_time;
        } else {
            trace!("first B preamble at {now}");
        }

        self.last_b_sync = self.n_syncs;
        self.last_b_time = now;

        self.previous = self.current;
        self.current = BlockStatus::default();
        self.left_bits = 0;
        self.right_bits = 0;
        self.left_wrapped = false;
        self.right_wrapped = false;
    }

    /// Appends one subframe's status bits to its channel's accumulator.
    fn accumulate(&mut self, frame_type: FrameType, subframe: Subframe) -> Result<(), SignalError> {
        // The index reaches 192 on the last subframe of every block, before
        // the closing B preamble is seen. A wrap is only a fault once the
        // same side accumulates again with no B sync in between.
        let wrapped = if frame_type.is_right() {
            &mut self.right_wrapped
        } else {
            &mut self.left_wrapped
        };
        if std::mem::take(wrapped) {
            log_or_err!(self, log::Level::Debug, SignalError::MissedBlockBoundary);
        }

        let (side, bits, wrapped) = if frame_type.is_right() {
            (
                &mut self.current.right,
                &mut self.right_bits,
                &mut self.right_wrapped,
            )
        } else {
            (
                &mut self.current.left,
                &mut self.left_bits,
                &mut self.left_wrapped,
            )
        };

        side.set(
            *bits,
            subframe.channel_status(),
            subframe.subcode(),
            subframe.validity(),
        );

        *bits += 1;
        if *bits >= BLOCK_FRAMES {
            // Keep accumulating from the top.
            *bits = 0;
            *wrapped = true;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One line-clock unit in ticks; payload cells are 2 units wide.
    const U: u16 = 10;

    #[derive(Default)]
    struct Collect {
        samples: Vec<SampleEvent>,
        blocks: Vec<(u64, u64, BlockStatus)>,
    }

    impl EventSink for Collect {
        fn sample(&mut self, event: &SampleEvent) {
            self.samples.push(*event);
        }

        fn block(&mut self, event: &BlockEvent<'_>) {
            self.blocks.push((event.start, event.end, *event.status));
        }
    }

    fn preamble_widths(frame_type: FrameType) -> [u16; 4] {
        match frame_type {
            FrameType::B => [3, 3, 1, 1],
            FrameType::M => [3, 1, 1, 3],
            FrameType::W => [3, 2, 1, 2],
            FrameType::Invalid => unreachable!(),
        }
    }

    /// Biphase-mark encodes bits 4..32 of `raw` behind the given preamble.
    fn encode_subframe(dts: &mut Vec<u16>, frame_type: FrameType, raw: u32) {
        for w in preamble_widths(frame_type) {
            dts.push(w * U);
        }
        for bitpos in 4..32 {
            if raw >> bitpos & 1 != 0 {
                dts.push(U);
                dts.push(U);
            } else {
                dts.push(2 * U);
            }
        }
    }

    fn feed(decoder: &mut Decoder<Collect>, dts: &[u16]) {
        let mut level = false;
        for &dt in dts {
            level = !level;
            decoder.push_edge(dt, level).unwrap();
        }
    }

    #[test]
    fn round_trip_b_subframe() {
        // 20-bit sample in bits 8..27, aux and status bits clear.
        let sample = 0x5_A5A5u32;
        let raw = sample << 8;

        let mut dts = Vec::new();
        for _ in 0..8 {
            encode_subframe(&mut dts, FrameType::B, raw);
        }

        let mut decoder = Decoder::new(Collect::default());
        feed(&mut decoder, &dts);

        let samples = &decoder.sink().samples;
        assert!(!samples.is_empty());

        let first = &samples[0];
        assert_eq!(first.frame_type, FrameType::B);
        assert_eq!(first.subframe.raw() >> 8 & 0xF_FFFF, sample);
        assert!(!first.subframe.validity());
        // Preamble starts at the very first pushed edge.
        assert_eq!(first.start, u64::from(3 * U));
        assert!(first.end > first.start);
    }

    #[test]
    fn alternating_channels_decode() {
        let mut dts = Vec::new();
        encode_subframe(&mut dts, FrameType::B, 0x0012_3400);
        encode_subframe(&mut dts, FrameType::W, 0x0043_2100);
        for _ in 0..3 {
            encode_subframe(&mut dts, FrameType::M, 0x0012_3400);
            encode_subframe(&mut dts, FrameType::W, 0x0043_2100);
        }

        let mut decoder = Decoder::new(Collect::default());
        feed(&mut decoder, &dts);

        let samples = &decoder.sink().samples;
        assert!(samples.len() >= 4);
        assert_eq!(samples[0].frame_type, FrameType::B);
        assert_eq!(samples[1].frame_type, FrameType::W);
        assert_eq!(samples[2].frame_type, FrameType::M);
        assert_eq!(samples[1].subframe.audio_24(), 0x04_3210);
        // Subframes are contiguous on a clean stream.
        assert_eq!(samples[0].end, samples[1].start);
    }

    /// Status bit pattern injected by the block tests.
    fn status_bits(i: usize) -> (bool, bool, bool) {
        (i % 3 == 0, i % 5 == 0, i % 7 == 0)
    }

    fn status_raw(i: usize) -> u32 {
        let (cs, sc, v) = status_bits(i);
        (u32::from(cs) << 30) | (u32::from(sc) << 29) | (u32::from(v) << 28)
    }

    #[test]
    fn block_accumulates_192_left_bits() {
        let mut dts = Vec::new();
        for i in 0..BLOCK_FRAMES {
            let frame_type = if i == 0 { FrameType::B } else { FrameType::M };
            encode_subframe(&mut dts, frame_type, status_raw(i));
        }
        // The closing B plus padding so it decodes before the stream ends.
        encode_subframe(&mut dts, FrameType::B, 0);
        for _ in 0..4 {
            encode_subframe(&mut dts, FrameType::M, 0);
        }

        let mut decoder = Decoder::new(Collect::default());
        feed(&mut decoder, &dts);

        let blocks = &decoder.sink().blocks;
        assert_eq!(blocks.len(), 1);

        let (start, end, status) = &blocks[0];
        assert_eq!(*start, u64::from(3 * U));
        assert!(end > start);
        assert_eq!(decoder.previous_block_syncs(), BLOCK_FRAMES as u64);
        assert_eq!(decoder.previous_block_ticks(), end - start);

        for i in 0..BLOCK_FRAMES {
            let (cs, sc, v) = status_bits(i);
            assert_eq!(status.left.channel_status_bit(i), cs, "status bit {i}");
            assert_eq!(status.left.subcode_bit(i), sc, "subcode bit {i}");
            assert_eq!(status.left.validity_bit(i), v, "validity bit {i}");
        }
        assert_eq!(status.right, crate::structs::status::SideStatus::default());
    }

    #[test]
    fn clean_block_is_quiet_at_debug_fail_level() {
        // The side bit index legitimately reaches 192 on the last subframe
        // of every block; that alone must not surface as an anomaly even
        // when every recoverable fault is made fatal.
        let mut dts = Vec::new();
        for i in 0..BLOCK_FRAMES {
            let frame_type = if i == 0 { FrameType::B } else { FrameType::M };
            encode_subframe(&mut dts, frame_type, status_raw(i));
        }
        encode_subframe(&mut dts, FrameType::B, 0);
        for _ in 0..4 {
            encode_subframe(&mut dts, FrameType::M, 0);
        }

        let mut decoder = Decoder::new(Collect::default());
        decoder.set_fail_level(log::Level::Debug);

        let mut level = false;
        for &dt in &dts {
            level = !level;
            assert!(decoder.push_edge(dt, level).is_ok());
        }
        assert_eq!(decoder.sink().blocks.len(), 1);
    }

    #[test]
    fn missing_block_boundary_raises_at_debug_fail_level() {
        // One B preamble, then more than 192 left subframes with no second
        // B: the subframe after the wrap confirms the lost boundary.
        let mut dts = Vec::new();
        encode_subframe(&mut dts, FrameType::B, 0);
        for _ in 0..BLOCK_FRAMES + 8 {
            encode_subframe(&mut dts, FrameType::M, 0);
        }

        let mut decoder = Decoder::new(Collect::default());
        decoder.set_fail_level(log::Level::Debug);

        let mut level = false;
        let mut result = Ok(());
        for &dt in &dts {
            level = !level;
            result = decoder.push_edge(dt, level);
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(SignalError::MissedBlockBoundary)));
    }

    #[test]
    fn incoherent_widths_emit_nothing() {
        let mut decoder = Decoder::new(Collect::default());

        // Spread of one tick: bad signal on every pass.
        let flat: Vec<u16> = (0..600).map(|i| 10 + (i & 1) as u16).collect();
        feed(&mut decoder, &flat);
        assert!(decoder.sink().samples.is_empty());

        // Decodable spread but no preamble structure: lost sync on every pass.
        let alternating: Vec<u16> = (0..600).map(|i| if i % 2 == 0 { 30 } else { 10 }).collect();
        feed(&mut decoder, &alternating);

        assert!(decoder.sink().samples.is_empty());
        assert!(decoder.sink().blocks.is_empty());
        assert_eq!(decoder.syncs(), 0);
        // The read cursor kept moving; the decoder never stalls.
        assert!(decoder.ring.read_index() > 0);
        assert!(decoder.ring.unread() < 2 * SAMPLE_EDGES as u64);
    }

    #[test]
    fn reset_clears_block_state() {
        let mut dts = Vec::new();
        encode_subframe(&mut dts, FrameType::B, u32::MAX & !0xF);
        for i in 1..20 {
            encode_subframe(&mut dts, FrameType::M, status_raw(i) | 0x4000_0000);
        }

        let mut decoder = Decoder::new(Collect::default());
        feed(&mut decoder, &dts);
        assert!(decoder.syncs() > 0);

        decoder.reset();
        assert_eq!(decoder.syncs(), 0);
        assert_eq!(decoder.block_starts(), 0);

        // A clean post-reset block must carry only its own bits.
        let mut dts = Vec::new();
        for i in 0..BLOCK_FRAMES {
            let frame_type = if i == 0 { FrameType::B } else { FrameType::M };
            encode_subframe(&mut dts, frame_type, 0);
        }
        encode_subframe(&mut dts, FrameType::B, 0);
        for _ in 0..4 {
            encode_subframe(&mut dts, FrameType::M, 0);
        }

        decoder.sink_mut().samples.clear();
        decoder.sink_mut().blocks.clear();
        feed(&mut decoder, &dts);

        let blocks = &decoder.sink().blocks;
        assert_eq!(blocks.len(), 1);
        let (_, _, status) = &blocks[0];
        assert_eq!(*status, BlockStatus::default());
    }

    #[test]
    fn resyncs_after_corrupt_span() {
        let mut dts = Vec::new();
        encode_subframe(&mut dts, FrameType::B, 0x00AB_CD00);
        // A corrupt stretch with plausible widths but no preambles.
        for i in 0..200u16 {
            dts.push(if i % 2 == 0 { 30 } else { 10 });
        }
        for _ in 0..8 {
            encode_subframe(&mut dts, FrameType::M, 0x00AB_CD00);
        }

        let mut decoder = Decoder::new(Collect::default());
        feed(&mut decoder, &dts);

        let samples = &decoder.sink().samples;
        assert!(!samples.is_empty());
        assert!(samples.iter().any(|s| s.frame_type == FrameType::M));
    }
}
