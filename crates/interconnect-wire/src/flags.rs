//! Frame flags for transfer frames

/// Frame flags (1 byte)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameFlags(pub u8);

impl FrameFlags {
    pub const NONE: FrameFlags = FrameFlags(0);

    // Flag bits
    pub const SIGNED: u8 = 0b0000_0001;
    pub const STRIPPED: u8 = 0b0000_0010;
    pub const KNOWN: u8 = Self::SIGNED | Self::STRIPPED;

    #[inline]
    pub fn new(bits: u8) -> Self {
        FrameFlags(bits)
    }

    /// Transfer frame carries a signature field
    #[inline]
    pub fn is_signed(self) -> bool {
        self.0 & Self::SIGNED != 0
    }

    /// Ack frame lists stripped passport fields
    #[inline]
    pub fn is_stripped(self) -> bool {
        self.0 & Self::STRIPPED != 0
    }

    /// Reserved bits must be zero
    #[inline]
    pub fn has_unknown_bits(self) -> bool {
        self.0 & !Self::KNOWN != 0
    }

    #[inline]
    pub fn set_signed(&mut self, value: bool) {
        self.set(Self::SIGNED, value);
    }

    #[inline]
    pub fn set_stripped(&mut self, value: bool) {
        self.set(Self::STRIPPED, value);
    }

    #[inline]
    fn set(&mut self, bit: u8, value: bool) {
        if value {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }
}
