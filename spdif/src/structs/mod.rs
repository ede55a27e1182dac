//! Data structures representing the transport's components.
//!
//! Contains the edge ring buffer fed by the capture source, subframe and
//! preamble types, and the per-block channel-status accumulators used
//! throughout the decoding pipeline.

pub mod edge;
pub mod frame;
pub mod status;
