//! Preamble detection.
//!
//! Subframes open with a 4-cell preamble that deliberately violates the
//! biphase-mark rule, so it cannot occur inside payload data. In pulse-width
//! terms the three patterns are:
//!
//! ```text
//! B   long  long  short short     block start, left channel
//! M   long  short short long      left channel
//! W   long  mid   short mid       right channel
//! ```
//!
//! The scanner walks the unread window one edge at a time, classifying
//! widths against the current thresholds, and stops on the first match.

use log::trace;

use super::threshold::Thresholds;
use crate::structs::edge::{EdgeRing, SAMPLE_EDGES};
use crate::structs::frame::FrameType;

/// Searches for a preamble starting at `cursor`.
///
/// Scans at most [`SAMPLE_EDGES`] positions. Returns the number of edges
/// passed over before the match (the preamble itself is not consumed) and
/// the frame type, or the full scan count and [`FrameType::Invalid`] when no
/// pattern matched. Malformed candidates are diagnostic-only; scanning
/// continues at the next position.
pub fn scan_preamble(ring: &EdgeRing, cursor: u64, thresholds: &Thresholds) -> (u64, FrameType) {
    for scanned in 0..SAMPLE_EDGES as u64 {
        let index = cursor + scanned;

        let e0 = ring.dt(index);
        if !thresholds.is_long(e0) {
            continue;
        }

        let e1 = ring.dt(index + 1);
        let e2 = ring.dt(index + 2);
        let e3 = ring.dt(index + 3);

        if thresholds.is_long(e1) {
            // long long . .
            if thresholds.is_short(e2) && thresholds.is_short(e3) {
                return (scanned, FrameType::B);
            }
            trace!("malformed B preamble at edge {index}: [{e0} {e1} {e2} {e3}]");
        } else if e1 > thresholds.t12 {
            // long mid . .
            if thresholds.is_short(e2) && thresholds.is_mid(e3) {
                return (scanned, FrameType::W);
            }
            trace!("malformed W preamble at edge {index}: [{e0} {e1} {e2} {e3}]");
        } else {
            // long short . .
            if thresholds.is_short(e2) && thresholds.is_long(e3) {
                return (scanned, FrameType::M);
            }
            trace!("malformed M preamble at edge {index}: [{e0} {e1} {e2} {e3}]");
        }
    }

    (SAMPLE_EDGES as u64, FrameType::Invalid)
}
