//! Signal-edge storage.
//!
//! The decoder never sees the raw waveform, only the sequence of level
//! transitions reported by a capture engine. Recent edges are kept in a
//! fixed-capacity ring addressed by monotonic write/read counters, so a
//! bounded window is always available for re-synchronization.

/// Capacity of the edge ring. Power of two so slot mapping is a mask.
pub const MAX_EDGES: usize = 1 << 8;

/// Number of edges examined per analysis pass.
pub const SAMPLE_EDGES: usize = 1 << 6;

const EDGE_MASK: u64 = MAX_EDGES as u64 - 1;

/// A single level transition on the line.
///
/// `at` is reconstructed by accumulating `dt` onto the previous edge's time;
/// it only exists to timestamp output events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Edge {
    /// Absolute time of the transition, in capture ticks.
    pub at: u64,
    /// Ticks elapsed since the previous transition.
    pub dt: u16,
    /// Line level after the transition.
    pub level: bool,
}

/// Fixed-capacity ring of recent edges.
///
/// The write and read counters increase monotonically and are only masked on
/// slot access, so `write_index - read_index` is always a valid count of
/// unread edges.
#[derive(Debug)]
pub struct EdgeRing {
    slots: [Edge; MAX_EDGES],
    wr: u64,
    rd: u64,
    last_at: u64,
}

impl Default for EdgeRing {
    fn default() -> Self {
        Self {
            slots: [Edge::default(); MAX_EDGES],
            wr: 0,
            rd: 0,
            last_at: 0,
        }
    }
}

impl EdgeRing {
    /// Appends one edge, accumulating its absolute time from the predecessor.
    ///
    /// If the ring is full the oldest unread edge is dropped to make room and
    /// `true` is returned; the caller decides how loudly to report that.
    pub fn push(&mut self, dt: u16, level: bool) -> bool {
        let overrun = self.wr - self.rd >= MAX_EDGES as u64;
        if overrun {
            self.rd += 1;
        }

        let at = self.last_at + u64::from(dt);
        self.slots[(self.wr & EDGE_MASK) as usize] = Edge { at, dt, level };
        self.last_at = at;
        self.wr += 1;

        overrun
    }

    /// Edge at a monotonic index. Indices older than `MAX_EDGES` behind the
    /// write counter alias newer slots; callers stay within the unread window.
    pub fn get(&self, index: u64) -> &Edge {
        &self.slots[(index & EDGE_MASK) as usize]
    }

    /// Pulse width of the edge at `index`.
    pub fn dt(&self, index: u64) -> u16 {
        self.get(index).dt
    }

    /// Absolute time of the edge at `index`.
    pub fn at(&self, index: u64) -> u64 {
        self.get(index).at
    }

    pub fn write_index(&self) -> u64 {
        self.wr
    }

    pub fn read_index(&self) -> u64 {
        self.rd
    }

    /// Count of edges pushed but not yet consumed.
    pub fn unread(&self) -> u64 {
        self.wr - self.rd
    }

    /// Consumes `n` edges.
    pub fn advance(&mut self, n: u64) {
        debug_assert!(self.rd + n <= self.wr);
        self.rd += n;
    }

    /// Returns the ring to its freshly-constructed state.
    pub fn clear(&mut self) {
        self.slots = [Edge::default(); MAX_EDGES];
        self.wr = 0;
        self.rd = 0;
        self.last_at = 0;
    }
}

#[test]
fn push_accumulates_time() {
    let mut ring = EdgeRing::default();
    ring.push(30, true);
    ring.push(10, false);
    ring.push(10, true);

    assert_eq!(ring.unread(), 3);
    assert_eq!(ring.at(0), 30);
    assert_eq!(ring.at(1), 40);
    assert_eq!(ring.at(2), 50);
    assert_eq!(ring.dt(1), 10);
    assert!(ring.get(2).level);
}

#[test]
fn indices_alias_past_capacity() {
    let mut ring = EdgeRing::default();
    for i in 0..MAX_EDGES as u64 + 5 {
        ring.advance(ring.unread());
        ring.push((i % 50 + 1) as u16, i % 2 == 0);
    }

    // Slot 0 was rewritten by edge number MAX_EDGES.
    assert_eq!(ring.dt(0), (MAX_EDGES as u64 % 50 + 1) as u16);
    assert_eq!(ring.dt(0), ring.dt(MAX_EDGES as u64));
    assert_eq!(ring.write_index(), MAX_EDGES as u64 + 5);
}

#[test]
fn full_ring_drops_oldest_unread() {
    let mut ring = EdgeRing::default();
    for i in 0..MAX_EDGES {
        assert!(!ring.push(i as u16 + 1, false));
    }

    assert_eq!(ring.unread(), MAX_EDGES as u64);
    assert!(ring.push(999, true));
    // Read cursor moved past the overwritten edge; window size is preserved.
    assert_eq!(ring.read_index(), 1);
    assert_eq!(ring.unread(), MAX_EDGES as u64);
    assert_eq!(ring.dt(ring.write_index() - 1), 999);
}

#[test]
fn clear_restores_fresh_state() {
    let mut ring = EdgeRing::default();
    ring.push(12, true);
    ring.push(7, false);
    ring.advance(1);
    ring.clear();

    assert_eq!(ring.unread(), 0);
    assert_eq!(ring.write_index(), 0);
    ring.push(5, true);
    assert_eq!(ring.at(0), 5);
}
