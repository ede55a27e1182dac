//! Pulse-width threshold estimation.
//!
//! Biphase-mark cells come in three widths, 1, 2 and 3 line clocks, and the
//! line clock itself is never known in advance. Each analysis pass derives
//! the two decision boundaries from the narrowest and widest pulse in the
//! unread window:
//!
//! ```text
//! |-min                              max-|
//! 111                                  333
//!                   222
//!          t12                 t23
//! ```
//!
//! The estimate is recomputed every pass, so the decoder tracks clock drift
//! without a fixed reference.

use crate::structs::edge::EdgeRing;

/// Spread above which the width distribution is treated as wide/noisy.
const WIDE_SPREAD: u16 = 9;

/// Decision boundaries between 1/2-clock and 2/3-clock pulse widths, in
/// capture ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Thresholds {
    pub t12: u16,
    pub t23: u16,
}

impl Thresholds {
    /// 1-clock-wide pulse.
    pub fn is_short(&self, dt: u16) -> bool {
        dt < self.t12
    }

    /// 3-clock-wide pulse.
    pub fn is_long(&self, dt: u16) -> bool {
        dt > self.t23
    }

    /// 2-clock-wide pulse.
    pub fn is_mid(&self, dt: u16) -> bool {
        (self.t12..=self.t23).contains(&dt)
    }

    /// True when either boundary moved by more than one tick. Used to gate
    /// drift logging, never to gate decoding.
    pub fn drifted_from(&self, other: &Thresholds) -> bool {
        self.t12.abs_diff(other.t12) > 1 || self.t23.abs_diff(other.t23) > 1
    }
}

/// Estimates thresholds over the closed-open edge window `[from, to)`.
///
/// Returns `None` when the observed widths leave no room for a distinct
/// 2-clock band; that is the bad-signal outcome and the caller skips forward
/// rather than decode garbage.
pub fn estimate(ring: &EdgeRing, from: u64, to: u64) -> Option<Thresholds> {
    if from >= to {
        return None;
    }

    let mut min_dt = ring.dt(from);
    let mut max_dt = min_dt;
    for index in from + 1..to {
        let dt = ring.dt(index);
        if min_dt > dt {
            min_dt = dt;
        } else if max_dt < dt {
            max_dt = dt;
        }
    }

    // With spread 0 or 1 every pulse falls in one band; nothing to decode.
    if max_dt - min_dt <= 1 {
        return None;
    }

    let min = u32::from(min_dt);
    let max = u32::from(max_dt);
    let mid = min + max;

    let thresholds = if max_dt - min_dt > WIDE_SPREAD {
        // Weight each boundary toward its extreme; tolerant of asymmetric
        // width distributions.
        Thresholds {
            t12: (((min << 1) + mid) >> 2) as u16,
            t23: (((max << 1) + mid) >> 2) as u16,
        }
    } else {
        // Tightly clustered widths: center a minimal 2-tick gap on the
        // midpoint.
        Thresholds {
            t12: ((mid - 2) >> 1) as u16,
            t23: ((mid + 2) >> 1) as u16,
        }
    };

    // Is there any room for a two-tick width?
    if thresholds.t23 - thresholds.t12 <= 1 {
        return None;
    }

    Some(thresholds)
}

#[cfg(test)]
fn ring_of(dts: &[u16]) -> EdgeRing {
    let mut ring = EdgeRing::default();
    for &dt in dts {
        ring.push(dt, false);
    }
    ring
}

#[test]
fn wide_spread_brackets_extremes() {
    let ring = ring_of(&[10, 20, 30, 10, 30, 20]);
    let th = estimate(&ring, 0, 6).unwrap();

    assert_eq!(th.t12, 15);
    assert_eq!(th.t23, 25);
    assert!(th.t12 < th.t23);
    assert!(th.is_short(10));
    assert!(th.is_mid(20));
    assert!(th.is_long(30));
}

#[test]
fn tight_cluster_centers_midpoint() {
    let ring = ring_of(&[8, 10, 9, 10, 8]);
    let th = estimate(&ring, 0, 5).unwrap();

    // mid = 18: a 2-tick gap around 9.
    assert_eq!(th.t12, 8);
    assert_eq!(th.t23, 10);
}

#[test]
fn narrow_spread_is_bad_signal() {
    assert!(estimate(&ring_of(&[10, 10, 10, 10]), 0, 4).is_none());
    assert!(estimate(&ring_of(&[10, 11, 10, 11]), 0, 4).is_none());
    assert!(estimate(&ring_of(&[]), 0, 0).is_none());
}

#[test]
fn window_bounds_are_respected() {
    // The wide outlier sits outside the window and must not skew t23.
    let ring = ring_of(&[10, 20, 30, 500]);
    let th = estimate(&ring, 0, 3).unwrap();

    assert_eq!(th.t23, 25);
}

#[test]
fn drift_gate() {
    let a = Thresholds { t12: 15, t23: 25 };
    assert!(!a.drifted_from(&Thresholds { t12: 16, t23: 24 }));
    assert!(a.drifted_from(&Thresholds { t12: 18, t23: 25 }));
    assert!(a.drifted_from(&Thresholds::default()));
}
