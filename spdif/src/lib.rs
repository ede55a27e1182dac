//! Streaming decoder for S/PDIF biphase-mark bitstreams.
//!
//! ## Technical Overview
//!
//! S/PDIF carries stereo PCM plus status metadata over a single serial line,
//! biphase-mark coded: every bit-cell opens with a transition and a `1` adds
//! a mid-cell transition. This crate reconstructs the transport from nothing
//! but signal-edge timestamps — "a transition happened `dt` ticks after the
//! previous one" — as delivered by a logic-analyzer style capture engine.
//!
//! The decoder is self-calibrating and self-synchronizing:
//!
//! 1. Pulse-width thresholds are re-estimated continuously from a small
//!    window of recent edges, so clock drift needs no external reference.
//! 2. Word preambles (B/M/W) are located by shape, marking subframe
//!    boundaries, channel identity and block starts.
//! 3. Each 32-bit subframe's audio sample and status bits are decoded, and
//!    per-block channel-status/subcode/validity bitfields are accumulated
//!    across 192-frame blocks.
//!
//! Transmission noise costs a bounded forward skip over a fixed-size recent
//! window; the stream is never aborted and history is never unbounded.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spdif::process::decode::Decoder;
//! use spdif::process::{BlockEvent, EventSink, SampleEvent};
//!
//! struct Print;
//!
//! impl EventSink for Print {
//!     fn sample(&mut self, event: &SampleEvent) {
//!         println!(
//!             "{} subframe {:#010x} @ {}",
//!             event.frame_type,
//!             event.subframe.raw(),
//!             event.start
//!         );
//!     }
//!
//!     fn block(&mut self, event: &BlockEvent<'_>) {
//!         println!("block of {} ticks", event.end - event.start);
//!     }
//! }
//!
//! let mut decoder = Decoder::new(Print);
//!
//! // Feed (dt, level) pairs from the capture source; events fire
//! // synchronously as subframes and blocks complete.
//! for (dt, level) in [(30u16, true), (30, false), (10, true), (10, false)] {
//!     decoder.push_edge(dt, level)?;
//! }
//! # Ok::<(), spdif::utils::errors::SignalError>(())
//! ```

/// The decoding pipeline.
///
/// 1. **Threshold Estimation** ([`process::threshold`]): pulse-width
///    boundaries from the recent-edge window.
/// 2. **Preamble Scanning** ([`process::sync`]): B/M/W sync detection.
/// 3. **Decoding** ([`process::decode`]): subframe reconstruction, block
///    accumulation and the streaming [`Decoder`](process::decode::Decoder).
pub mod process;

/// Data structures representing the transport's components.
///
/// - **Edges** ([`structs::edge`]): the capture-fed ring buffer
/// - **Subframes** ([`structs::frame`]): frame types and bit layout
/// - **Channel Status** ([`structs::status`]): per-block accumulators
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Error Handling** ([`utils::errors`]): anomaly types and fail levels
pub mod utils;
