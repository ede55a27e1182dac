//! Per-block channel-status, subcode and validity accumulators.
//!
//! Each block carries 384 status bits, but the left and right subframes are
//! supposed to transmit the same channel status, so 192 bits per side are
//! collected separately and can be compared. Bits are stored LSB-first in
//! transmission order.

/// Subframes per channel between two B preambles.
pub const BLOCK_FRAMES: usize = 192;

/// Bytes per 192-bit accumulator field.
pub const BLOCK_BYTES: usize = BLOCK_FRAMES / 8;

/// Status bitfields accumulated for one channel over one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideStatus {
    pub channel_status: [u8; BLOCK_BYTES],
    pub subcode: [u8; BLOCK_BYTES],
    pub validity: [u8; BLOCK_BYTES],
}

impl Default for SideStatus {
    fn default() -> Self {
        Self {
            channel_status: [0; BLOCK_BYTES],
            subcode: [0; BLOCK_BYTES],
            validity: [0; BLOCK_BYTES],
        }
    }
}

impl SideStatus {
    /// ORs one subframe's status bits into position `index`.
    ///
    /// The accumulator is cleared at each block boundary, never per bit, so a
    /// wrapped index rewrites on top of stale bits. That matches the wire
    /// behavior when a B preamble goes missing.
    pub(crate) fn set(&mut self, index: usize, status: bool, subcode: bool, validity: bool) {
        let byte = index >> 3;
        let mask = 1u8 << (index & 0x7);

        if status {
            self.channel_status[byte] |= mask;
        }
        if subcode {
            self.subcode[byte] |= mask;
        }
        if validity {
            self.validity[byte] |= mask;
        }
    }

    pub fn channel_status_bit(&self, index: usize) -> bool {
        self.channel_status[index >> 3] >> (index & 0x7) & 1 != 0
    }

    pub fn subcode_bit(&self, index: usize) -> bool {
        self.subcode[index >> 3] >> (index & 0x7) & 1 != 0
    }

    pub fn validity_bit(&self, index: usize) -> bool {
        self.validity[index >> 3] >> (index & 0x7) & 1 != 0
    }

    /// Channel-status bit 0: professional (AES/EBU) rather than consumer use.
    pub fn professional(&self) -> bool {
        self.channel_status_bit(0)
    }

    /// Channel-status bit 1: payload is not linear PCM audio.
    pub fn non_audio(&self) -> bool {
        self.channel_status_bit(1)
    }

    /// Channel-status bit 2: copying is permitted.
    pub fn copy_permitted(&self) -> bool {
        self.channel_status_bit(2)
    }

    /// Channel-status bit 3: pre-emphasis applied to the audio.
    pub fn pre_emphasis(&self) -> bool {
        self.channel_status_bit(3)
    }

    /// Category code, channel-status bits 8-15 (0 = general, 1 = CD, ...).
    pub fn category_code(&self) -> u8 {
        self.channel_status[1]
    }
}

/// Status bitfields for both channels of one block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockStatus {
    pub left: SideStatus,
    pub right: SideStatus,
}

impl BlockStatus {
    /// The transmitter is required to send identical channel status on both
    /// subframes; a mismatch indicates decode errors or a broken source.
    pub fn channels_match(&self) -> bool {
        self.left.channel_status == self.right.channel_status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_land_lsb_first() {
        let mut side = SideStatus::default();
        side.set(0, true, false, false);
        side.set(9, true, true, false);
        side.set(191, false, false, true);

        assert_eq!(side.channel_status[0], 0x01);
        assert_eq!(side.channel_status[1], 0x02);
        assert_eq!(side.subcode[1], 0x02);
        assert_eq!(side.validity[23], 0x80);
        assert!(side.channel_status_bit(9));
        assert!(side.validity_bit(191));
        assert!(!side.subcode_bit(191));
    }

    #[test]
    fn control_bit_accessors() {
        let mut side = SideStatus::default();
        side.set(1, true, false, false);
        side.set(3, true, false, false);
        for bit in 0..8 {
            // Category code 0x01: CD format.
            side.set(8 + bit, bit == 0, false, false);
        }

        assert!(!side.professional());
        assert!(side.non_audio());
        assert!(!side.copy_permitted());
        assert!(side.pre_emphasis());
        assert_eq!(side.category_code(), 0x01);
    }

    #[test]
    fn channel_mismatch_detected() {
        let mut block = BlockStatus::default();
        assert!(block.channels_match());

        block.left.set(4, true, false, false);
        assert!(!block.channels_match());

        block.right.set(4, true, false, false);
        assert!(block.channels_match());
    }
}
