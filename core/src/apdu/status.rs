use std::fmt::{Display, Formatter};

/// The two trailing octets (SW1, SW2) of a response
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StatusWord(u16);

impl StatusWord {
    /// Normal processing.
    pub const OK: Self = Self(0x9000);

    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    pub const fn from_bytes(sw1: u8, sw2: u8) -> Self {
        Self(u16::from_be_bytes([sw1, sw2]))
    }

    pub const fn sw1(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn sw2(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Determines whether the word reports success.
    pub fn is_success(self) -> bool {
        self == Self::OK
    }

    /// Describes the common ISO 7816-4 words, for diagnostics.
    pub fn description(self) -> Option<&'static str> {
        Some(match self.0 {
            0x9000 => "normal processing",
            0x6281 => "part of returned data may be corrupted",
            0x6282 => "end of file reached before reading Le bytes",
            0x6700 => "wrong length",
            0x6982 => "security status not satisfied",
            0x6985 => "conditions of use not satisfied",
            0x6A80 => "incorrect parameters in the data field",
            0x6A81 => "function not supported",
            0x6A82 => "file or application not found",
            0x6A86 => "incorrect parameters P1-P2",
            0x6B00 => "wrong parameters P1-P2",
            0x6D00 => "instruction not supported",
            0x6E00 => "class not supported",
            0x6F00 => "no precise diagnosis",
            _ => match self.sw1() {
                0x61 => "response bytes still available",
                0x63 => "warning, state of non-volatile memory changed",
                0x6C => "wrong Le field",
                _ => return None,
            },
        })
    }
}

impl Display for StatusWord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04X}", self.0)?;

        if let Some(description) = self.description() {
            write!(f, " ({})", description)?;
        }

        Ok(())
    }
}

impl From<u16> for StatusWord {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<(u8, u8)> for StatusWord {
    fn from((sw1, sw2): (u8, u8)) -> Self {
        Self::from_bytes(sw1, sw2)
    }
}

impl From<StatusWord> for u16 {
    fn from(sw: StatusWord) -> Self {
        sw.0
    }
}
