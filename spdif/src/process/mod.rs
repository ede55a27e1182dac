//! The decoding pipeline.
//!
//! Three stages run over the edge ring on every analysis pass:
//!
//! 1. **Threshold estimation** ([`threshold`]): derive the 1/2- and
//!    2/3-clock pulse-width boundaries from the unread window.
//! 2. **Preamble scanning** ([`sync`]): locate the next B/M/W sync pattern.
//! 3. **Subframe decoding** ([`decode`]): reconstruct the 32-bit subframe
//!    and accumulate channel-status blocks.
//!
//! Each stage takes an immutable view of the ring plus a cursor and reports
//! how far it advanced, so the stages are testable without a live stream.
//! [`decode::Decoder`] ties them together and delivers results through an
//! [`EventSink`].

use crate::structs::frame::{FrameType, Subframe};
use crate::structs::status::BlockStatus;

pub mod decode;
pub mod sync;
pub mod threshold;

/// One successfully decoded subframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleEvent {
    /// Time of the first preamble edge, in capture ticks.
    pub start: u64,
    /// Time of the first edge after the subframe.
    pub end: u64,
    pub frame_type: FrameType,
    pub subframe: Subframe,
}

/// One completed 192-frame channel-status block.
///
/// Blocks are reported one boundary late: the payload accumulated since the
/// previous B preamble is delivered when the next B preamble confirms it.
#[derive(Debug, Clone, Copy)]
pub struct BlockEvent<'a> {
    /// Time of the B preamble that opened the block.
    pub start: u64,
    /// Time of the B preamble that closed it.
    pub end: u64,
    pub status: &'a BlockStatus,
}

/// Receiver for decoded output, supplied at decoder construction.
///
/// Both methods are invoked synchronously from
/// [`Decoder::push_edge`](decode::Decoder::push_edge), zero or more times
/// per call.
pub trait EventSink {
    fn sample(&mut self, event: &SampleEvent);
    fn block(&mut self, event: &BlockEvent<'_>);
}

/// Discards all events; useful when only the decoder's counters matter.
impl EventSink for () {
    fn sample(&mut self, _event: &SampleEvent) {}
    fn block(&mut self, _event: &BlockEvent<'_>) {}
}
