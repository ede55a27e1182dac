//! Subframe representation and preamble classification.
//!
//! Every sample crosses the wire as a 32-bit subframe:
//!
//! | bits  | meaning                        |
//! |-------|--------------------------------|
//! | 0-3   | preamble (B/M/W, not data)     |
//! | 4-27  | auxiliary + audio sample       |
//! | 28    | validity                       |
//! | 29    | subcode (user) bit             |
//! | 30    | channel-status bit             |
//! | 31    | parity over bits 4-30          |
//!
//! A 24-bit sample occupies bits 4-27; 16-bit sources use bits 12-27 and
//! leave the low bits zero.

use std::fmt::Display;

/// Preamble classification for one decoded subframe.
///
/// `B` starts a new channel-status block and carries subframe 0 of the left
/// channel; `M` is any other left-channel subframe; `W` is a right-channel
/// subframe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FrameType {
    #[default]
    Invalid,
    B,
    M,
    W,
}

impl FrameType {
    /// Left-channel subframe (`B` or `M`).
    pub fn is_left(self) -> bool {
        matches!(self, FrameType::B | FrameType::M)
    }

    /// Right-channel subframe (`W`).
    pub fn is_right(self) -> bool {
        self == FrameType::W
    }

    /// Marks the start of a 192-frame channel-status block.
    pub fn is_block_start(self) -> bool {
        self == FrameType::B
    }
}

impl Display for FrameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameType::Invalid => write!(f, "invalid"),
            FrameType::B => write!(f, "B"),
            FrameType::M => write!(f, "M"),
            FrameType::W => write!(f, "W"),
        }
    }
}

/// One decoded 32-bit subframe.
///
/// Bits are packed LSB-first in transmission order; the preamble positions
/// (bits 0-3) are consumed during sync detection and always read zero here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Subframe(pub u32);

impl Subframe {
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Full-width audio payload, bits 4-27.
    pub fn audio_24(self) -> u32 {
        (self.0 >> 4) & 0xFF_FFFF
    }

    /// 16-bit PCM view of the payload, bits 12-27.
    pub fn pcm_16(self) -> i16 {
        ((self.0 >> 12) & 0xFFFF) as u16 as i16
    }

    /// Validity flag, bit 28. Set means the sample should not be used.
    pub fn validity(self) -> bool {
        self.0 >> 28 & 1 != 0
    }

    /// Subcode (user data) bit, bit 29.
    pub fn subcode(self) -> bool {
        self.0 >> 29 & 1 != 0
    }

    /// Channel-status bit, bit 30.
    pub fn channel_status(self) -> bool {
        self.0 >> 30 & 1 != 0
    }

    /// Parity bit, bit 31. Not verified by the decoder.
    pub fn parity(self) -> bool {
        self.0 >> 31 & 1 != 0
    }
}

#[test]
fn subframe_bit_fields() {
    let sf = Subframe(0x5ABC_DEF0);

    assert_eq!(sf.audio_24(), 0xAB_CDEF);
    assert_eq!(sf.pcm_16() as u16, 0xABCD);
    assert!(sf.validity());
    assert!(!sf.subcode());
    assert!(sf.channel_status());
    assert!(!sf.parity());
}

#[test]
fn pcm_view_is_signed() {
    // Bit 27 is the sign bit of the 16-bit view.
    let sf = Subframe(0x0800_0000);
    assert_eq!(sf.pcm_16(), i16::MIN);

    let sf = Subframe(0x07FF_F000);
    assert_eq!(sf.pcm_16(), i16::MAX);
}

#[test]
fn frame_type_channels() {
    assert!(FrameType::B.is_left());
    assert!(FrameType::M.is_left());
    assert!(FrameType::W.is_right());
    assert!(FrameType::B.is_block_start());
    assert!(!FrameType::M.is_block_start());
    assert!(!FrameType::Invalid.is_left());
}
